//! Model input encoding.
//!
//! Encoding is pure: equal snapshots always produce byte-identical input,
//! which keeps decision logs reproducible.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::WorldSnapshot;

/// Bytes handed to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EncodedInput(Vec<u8>);

impl EncodedInput {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for EncodedInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for EncodedInput {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Encode a snapshot as
/// `health=H;location=P;nearby_npcs=NPC[id=I,name=N,location=P];...`.
///
/// A snapshot without an actor encodes health `0` at the origin.
pub fn encode_snapshot(snapshot: &WorldSnapshot) -> EncodedInput {
    let mut out = String::with_capacity(64 + snapshot.nearby.len() * 64);

    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "health={};location={};nearby_npcs=",
        snapshot.health(),
        snapshot.position()
    );

    for (i, entity) in snapshot.nearby.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        let _ = write!(
            out,
            "NPC[id={},name={},location={}]",
            entity.id, entity.name, entity.position
        );
    }

    EncodedInput(out.into_bytes())
}

/// Chat triggers go to the model as their UTF-8 bytes, unchanged.
pub fn encode_message(message: &str) -> EncodedInput {
    EncodedInput(message.as_bytes().to_vec())
}
