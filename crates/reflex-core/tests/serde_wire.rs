#![cfg(feature = "serde")]

use reflex_core::{ActionId, ActionName, ActorState, NearbyEntity, WorldPosition, WorldSnapshot};

#[test]
fn ids_and_names_are_plain_scalars() {
    assert_eq!(serde_json::to_string(&ActionId(4)).unwrap(), "4");
    assert_eq!(
        serde_json::to_string(&ActionName::new("move_east")).unwrap(),
        "\"move_east\""
    );

    let name: ActionName = serde_json::from_str("\"defend\"").expect("deserialize name");
    assert_eq!(name.as_str(), "defend");
}

#[test]
fn snapshot_survives_a_json_trip() {
    let snapshot = WorldSnapshot::new(
        ActorState {
            health: 12,
            position: WorldPosition::new(3222, 3218, 0),
        },
        vec![NearbyEntity {
            id: 9,
            name: "Giant rat".into(),
            position: WorldPosition::new(3223, 3218, 0),
        }],
    );

    let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
    let back: WorldSnapshot = serde_json::from_str(&json).expect("deserialize snapshot");

    assert_eq!(back, snapshot);
    assert_eq!(back.primary_target().map(|e| e.id), Some(9));
}
