//! Deterministic, host-agnostic decision primitives.
//!
//! Everything in this crate is synchronous and free of I/O: the catalog that
//! turns raw model output into named actions, the snapshot a decision is made
//! against, the encoder that feeds the model, and the executor that turns a
//! decision back into world mutations.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod encode;
pub mod error;
pub mod executor;
pub mod snapshot;
pub mod world;

pub use action::{ActionCatalog, ActionId, ActionName, Direction, GameAction};
pub use encode::{encode_message, encode_snapshot, EncodedInput};
pub use error::ConfigError;
pub use executor::{ActionExecutor, ActionOutcome, ExecutorConfig};
pub use snapshot::{ActorState, NearbyEntity, WorldPosition, WorldSnapshot};
pub use world::{Interaction, WorldMut, WorldView};
