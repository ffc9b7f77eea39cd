use crate::{
    ActionName, Direction, GameAction, Interaction, WorldMut, WorldPosition, WorldSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Announce `Idling` when an idle (or unknown) action is applied.
    pub announce_idle: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            announce_idle: true,
        }
    }
}

/// What an [`ActionExecutor::apply`] call did to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Attacked { target: Option<u32> },
    Defended,
    Moved { to: WorldPosition },
    Idled,
}

impl ActionOutcome {
    /// Whether the world itself changed (notifications do not count).
    pub fn mutated(self) -> bool {
        !matches!(self, ActionOutcome::Idled)
    }
}

/// Turns a resolved action name into world calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor {
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Apply `name` against the snapshot it was decided on.
    ///
    /// Movement targets are offsets of the snapshot position, not of wherever
    /// the actor is when this runs. Unknown names behave like `idle`, and so
    /// does a move with no actor in the snapshot or no tile to step onto.
    pub fn apply<W>(
        &self,
        name: &ActionName,
        snapshot: &WorldSnapshot,
        world: &mut W,
    ) -> ActionOutcome
    where
        W: WorldMut + ?Sized,
    {
        match GameAction::from_name(name.as_str()).unwrap_or(GameAction::Idle) {
            GameAction::Attack => {
                let target = snapshot.primary_target().map(|e| e.id);
                world.interact(Interaction::Attack { target });
                world.notify("Performing Attack");
                ActionOutcome::Attacked { target }
            }
            GameAction::Defend => {
                world.interact(Interaction::Defend);
                world.notify("Performing Defend");
                ActionOutcome::Defended
            }
            GameAction::Move(direction) => match step(snapshot, direction) {
                Some(to) => {
                    world.set_position(to);
                    world.notify(&format!("Moving to {to}"));
                    ActionOutcome::Moved { to }
                }
                None => self.idle(world),
            },
            GameAction::Idle => self.idle(world),
        }
    }

    fn idle<W: WorldMut + ?Sized>(&self, world: &mut W) -> ActionOutcome {
        if self.config.announce_idle {
            world.notify("Idling");
        }
        ActionOutcome::Idled
    }
}

/// The tile one step away from the captured actor, if there is one.
fn step(snapshot: &WorldSnapshot, direction: Direction) -> Option<WorldPosition> {
    let (dx, dy) = direction.offset();
    snapshot.actor?.position.checked_offset(dx, dy)
}
