//! Simulated world - a small arena that stands in for a live game client.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reflex_core::{
    ActorState, Interaction, NearbyEntity, WorldMut, WorldPosition, WorldSnapshot, WorldView,
};

const MAX_HEALTH: i32 = 99;
const MAX_HOSTILES: usize = 3;
const ARENA: i32 = 8;
const NAMES: [&str; 4] = ["Goblin", "Giant rat", "Skeleton", "Dark wizard"];

/// Host-side events the arena produced on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    PlayerMoved,
    ActorDied,
    InventoryChanged,
}

#[derive(Debug, Clone)]
struct Hostile {
    entity: NearbyEntity,
    health: i32,
}

/// Seeded arena. Reads go through [`WorldView`], writes through [`WorldMut`].
pub struct SimWorld {
    rng: StdRng,
    tick: u64,
    actor: ActorState,
    hostiles: Vec<Hostile>,
    next_id: u32,
    defending: bool,
    moved: bool,
    pending: Vec<SimEvent>,
    notices: usize,
}

impl SimWorld {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
            actor: ActorState {
                health: MAX_HEALTH,
                position: WorldPosition::new(3200, 3200, 0),
            },
            hostiles: Vec::new(),
            next_id: 1,
            defending: false,
            moved: false,
            pending: Vec::new(),
            notices: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn notices(&self) -> usize {
        self.notices
    }

    /// Advance the arena one tick and report what the host would broadcast.
    pub fn advance(&mut self) -> Vec<SimEvent> {
        self.tick += 1;
        let mut events = std::mem::take(&mut self.pending);

        if self.moved {
            self.moved = false;
            events.push(SimEvent::PlayerMoved);
        }

        if self.hostiles.len() < MAX_HOSTILES && self.rng.gen_bool(0.25) {
            self.spawn_hostile();
        }

        let home = self.actor.position;
        let mut incoming = 0;
        for hostile in &mut self.hostiles {
            let pos = &mut hostile.entity.position;
            pos.x = (pos.x + self.rng.gen_range(-1..=1)).clamp(home.x - ARENA, home.x + ARENA);
            pos.y = (pos.y + self.rng.gen_range(-1..=1)).clamp(home.y - ARENA, home.y + ARENA);
            if (pos.x - home.x).abs() <= 1 && (pos.y - home.y).abs() <= 1 && self.rng.gen_bool(0.5)
            {
                incoming += self.rng.gen_range(1..=6);
            }
        }
        if self.defending {
            incoming /= 2;
            self.defending = false;
        }
        self.actor.health -= incoming;

        if self.actor.health <= 0 {
            tracing::info!(tick = self.tick, "Actor died, respawning");
            self.actor.health = MAX_HEALTH;
            self.hostiles.clear();
            events.push(SimEvent::ActorDied);
        }

        if self.rng.gen_bool(0.05) {
            events.push(SimEvent::InventoryChanged);
        }

        events
    }

    fn spawn_hostile(&mut self) {
        let name = NAMES[self.rng.gen_range(0..NAMES.len())];
        let position = self.actor.position.offset(
            self.rng.gen_range(-ARENA..=ARENA),
            self.rng.gen_range(-ARENA..=ARENA),
        );
        let entity = NearbyEntity {
            id: self.next_id,
            name: name.to_string(),
            position,
        };
        self.next_id += 1;
        tracing::debug!(id = entity.id, name, "Hostile spawned");
        self.hostiles.push(Hostile {
            entity,
            health: self.rng.gen_range(5..=20),
        });
    }
}

impl WorldView for SimWorld {
    fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::new(
            self.actor,
            self.hostiles.iter().map(|h| h.entity.clone()).collect(),
        )
    }
}

impl WorldMut for SimWorld {
    fn set_position(&mut self, target: WorldPosition) {
        if target != self.actor.position {
            self.actor.position = target;
            self.moved = true;
        }
    }

    fn interact(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Attack { target } => {
                let index = match target {
                    Some(id) => self.hostiles.iter().position(|h| h.entity.id == id),
                    None => (!self.hostiles.is_empty()).then_some(0),
                };
                let Some(index) = index else {
                    return;
                };
                let damage = self.rng.gen_range(1..=12);
                let hostile = &mut self.hostiles[index];
                hostile.health -= damage;
                if hostile.health <= 0 {
                    let slain = self.hostiles.remove(index);
                    tracing::info!(
                        id = slain.entity.id,
                        name = %slain.entity.name,
                        "Hostile slain"
                    );
                    self.pending.push(SimEvent::ActorDied);
                    // Loot lands in the inventory.
                    self.pending.push(SimEvent::InventoryChanged);
                }
            }
            Interaction::Defend => self.defending = true,
        }
    }

    fn notify(&mut self, message: &str) {
        self.notices += 1;
        println!("[tick {:>4}] {}", self.tick, message);
    }
}
