#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use reflex_core::{
    ActionId, ActorState, EncodedInput, Interaction, NearbyEntity, WorldMut, WorldPosition,
    WorldSnapshot, WorldView,
};
use reflex_kernel::{
    AgentConfig, Applied, Applier, InferenceError, Model, ModelLoadError, ModelLoader,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Host double: readable like a live world, records every mutation.
pub struct TestWorld {
    pub actor: ActorState,
    pub nearby: Vec<NearbyEntity>,
    pub moves: Vec<WorldPosition>,
    pub interactions: Vec<Interaction>,
    pub notices: Vec<String>,
    pub on_move: Option<Box<dyn FnMut()>>,
}

impl TestWorld {
    pub fn at(x: i32, y: i32, plane: i32) -> Self {
        Self {
            actor: ActorState {
                health: 75,
                position: WorldPosition::new(x, y, plane),
            },
            nearby: Vec::new(),
            moves: Vec::new(),
            interactions: Vec::new(),
            notices: Vec::new(),
            on_move: None,
        }
    }

    pub fn with_goblin(mut self) -> Self {
        self.nearby.push(NearbyEntity {
            id: 7,
            name: "Goblin".into(),
            position: WorldPosition::new(self.actor.position.x + 1, self.actor.position.y, 0),
        });
        self
    }

    pub fn mutations(&self) -> usize {
        self.moves.len() + self.interactions.len()
    }
}

impl WorldView for TestWorld {
    fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::new(self.actor, self.nearby.clone())
    }
}

impl WorldMut for TestWorld {
    fn set_position(&mut self, target: WorldPosition) {
        self.actor.position = target;
        self.moves.push(target);
        if let Some(hook) = self.on_move.as_mut() {
            hook();
        }
    }

    fn interact(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

/// Always answers the same id.
pub struct Fixed(pub u32);

impl Model for Fixed {
    fn predict(&self, _input: &EncodedInput) -> Result<ActionId, InferenceError> {
        Ok(ActionId(self.0))
    }
}

/// Blocks every prediction until the test releases it.
pub struct Gated {
    answer: u32,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

/// Test side of a [`Gated`] model.
pub struct Gate {
    pub entered: mpsc::Receiver<()>,
    pub release: mpsc::Sender<()>,
}

impl Gate {
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(TIMEOUT)
            .expect("prediction should have started");
    }

    pub fn open(&self, times: usize) {
        for _ in 0..times {
            let _ = self.release.send(());
        }
    }
}

pub fn gated(answer: u32) -> (Gated, Gate) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let model = Gated {
        answer,
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let gate = Gate {
        entered: entered_rx,
        release: release_tx,
    };
    (model, gate)
}

impl Model for Gated {
    fn predict(&self, _input: &EncodedInput) -> Result<ActionId, InferenceError> {
        let _ = self.entered.lock().unwrap().send(());
        match self.release.lock().unwrap().recv() {
            Ok(()) => Ok(ActionId(self.answer)),
            Err(_) => Err(InferenceError::Backend("gate dropped".into())),
        }
    }
}

/// Holds inputs containing `pattern` on a gate; answers the rest at once.
pub struct Split {
    pattern: &'static str,
    held: Gated,
    other: u32,
}

pub fn split(pattern: &'static str, held: u32, other: u32) -> (Split, Gate) {
    let (held, gate) = gated(held);
    let model = Split {
        pattern,
        held,
        other,
    };
    (model, gate)
}

impl Model for Split {
    fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError> {
        if input.to_string_lossy().contains(self.pattern) {
            self.held.predict(input)
        } else {
            Ok(ActionId(self.other))
        }
    }
}

struct Shared(Arc<dyn Model>);

impl Model for Shared {
    fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError> {
        self.0.predict(input)
    }
}

/// Serves models registered under a path; anything else is rejected.
#[derive(Default)]
pub struct MapLoader {
    models: Mutex<HashMap<PathBuf, Arc<dyn Model>>>,
}

impl MapLoader {
    pub fn with(self, path: &str, model: impl Model) -> Self {
        self.models
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), Arc::new(model));
        self
    }
}

impl ModelLoader for MapLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Model>, ModelLoadError> {
        match self.models.lock().unwrap().get(path) {
            Some(model) => Ok(Box::new(Shared(model.clone()))),
            None => Err(ModelLoadError::Rejected {
                path: path.to_path_buf(),
                reason: "unknown test model".into(),
            }),
        }
    }
}

/// Defaults with a named model, one worker and no decision log.
pub fn config(model: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.model.path = PathBuf::from(model);
    config.dispatch.workers = 1;
    config.decision_log = None;
    config
}

/// Apply effects until an action lands, skipping notices.
pub async fn next_action(applier: &mut Applier, world: &mut TestWorld) -> Applied {
    loop {
        let applied = tokio::time::timeout(TIMEOUT, applier.apply_next(world))
            .await
            .expect("applier timed out")
            .expect("pipeline still running");
        if matches!(applied, Applied::Action { .. }) {
            return applied;
        }
    }
}
