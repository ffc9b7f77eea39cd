use crate::{WorldPosition, WorldSnapshot};

/// Read-only world access for the event-producing context.
///
/// `snapshot` runs synchronously inside host callbacks, so it must be cheap
/// and must copy out everything it returns.
pub trait WorldView {
    fn snapshot(&self) -> WorldSnapshot;
}

/// Interactions the actor can start with the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Attack the given entity, or whatever is in range without one.
    Attack { target: Option<u32> },
    Defend,
}

/// Write access / effect sink.
///
/// Only the mutation context holds a `&mut` to an implementor; nothing else in
/// the pipeline can reach these methods.
pub trait WorldMut {
    fn set_position(&mut self, target: WorldPosition);

    fn interact(&mut self, interaction: Interaction);

    /// Surface a message to the player. Not a world mutation.
    fn notify(&mut self, message: &str);
}
