mod support;

use std::sync::Arc;

use reflex_core::{ActionOutcome, Interaction, WorldPosition};
use reflex_kernel::config::ActionEntry;
use reflex_kernel::{Agent, Applied, Channel, TaskId};

use support::{config, gated, next_action, split, Fixed, MapLoader, TestWorld};

fn action_name(applied: &Applied) -> &str {
    match applied {
        Applied::Action { action, .. } => action.as_str(),
        Applied::Notice(message) => panic!("expected an action, got notice {message:?}"),
    }
}

#[tokio::test]
async fn attack_id_applies_exactly_one_attack() {
    let mut config = config("attack");
    config.actions = vec![
        ActionEntry {
            id: 0,
            name: "attack".into(),
        },
        ActionEntry {
            id: 1,
            name: "idle".into(),
        },
    ];
    let loader = Arc::new(MapLoader::default().with("attack", Fixed(0)));
    let (agent, mut applier) = Agent::start_with_loader(&config, loader).unwrap();
    let mut world = TestWorld::at(3, 4, 0).with_goblin();

    agent.dispatcher().on_game_tick(&world).unwrap();
    let applied = next_action(&mut applier, &mut world).await;

    match applied {
        Applied::Action {
            channel,
            action,
            outcome,
            ..
        } => {
            assert_eq!(channel, Channel::Tick);
            assert_eq!(action.as_str(), "attack");
            assert_eq!(outcome, ActionOutcome::Attacked { target: Some(7) });
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(world.interactions, vec![Interaction::Attack { target: Some(7) }]);
    assert!(world.moves.is_empty());
    assert_eq!(world.notices, vec!["Performing Attack".to_string()]);
    assert_eq!(applier.pump(&mut world), 0);

    let stats = agent.join().await;
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.applied, 1);
}

#[tokio::test]
async fn movement_uses_the_snapshot_captured_at_dispatch() {
    let loader = Arc::new(MapLoader::default().with("north", Fixed(2)));
    let (agent, mut applier) = Agent::start_with_loader(&config("north"), loader).unwrap();
    let mut world = TestWorld::at(10, 20, 0);

    agent.dispatcher().on_player_moved(&world).unwrap();
    // The actor keeps walking before the decision lands.
    world.actor.position = WorldPosition::new(12, 20, 0);

    let applied = next_action(&mut applier, &mut world).await;
    assert_eq!(action_name(&applied), "move_north");
    assert_eq!(world.moves, vec![WorldPosition::new(10, 21, 0)]);
    assert_eq!(
        world.notices,
        vec!["Moving to WorldPoint(x=10, y=21, plane=0)".to_string()]
    );
}

#[tokio::test]
async fn empty_input_resolves_to_idle_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config("attack");
    config.decision_log = Some(dir.path().join("decisions.jsonl"));
    let loader = Arc::new(MapLoader::default().with("attack", Fixed(0)));
    let (agent, mut applier) = Agent::start_with_loader(&config, loader).unwrap();
    let mut world = TestWorld::at(0, 0, 0).with_goblin();

    agent.dispatcher().on_chat_message("", &world).unwrap();
    let applied = next_action(&mut applier, &mut world).await;

    assert_eq!(action_name(&applied), "idle");
    assert_eq!(world.mutations(), 0);
    assert_eq!(world.notices, vec!["Idling".to_string()]);

    let stats = agent.stats();
    assert_eq!(stats.inference_failures, 1);
    assert_eq!(stats.applied, 1);

    let records = agent.decision_log().unwrap().read_recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, Channel::Chat);
    assert_eq!(records[0].action, "idle");
    assert_eq!(records[0].action_id, None);
    assert_eq!(records[0].fallback.as_deref(), Some("empty model input"));
}

#[tokio::test]
async fn unknown_ids_fall_back_to_idle() {
    let mut config = config("wild");
    config.announce_idle = false;
    let loader = Arc::new(MapLoader::default().with("wild", Fixed(42)));
    let (agent, mut applier) = Agent::start_with_loader(&config, loader).unwrap();
    let mut world = TestWorld::at(0, 0, 0);

    agent.dispatcher().on_actor_death(&world).unwrap();
    let applied = next_action(&mut applier, &mut world).await;

    assert_eq!(action_name(&applied), "idle");
    assert_eq!(world.mutations(), 0);
    assert!(world.notices.is_empty());
    assert_eq!(agent.stats().inference_failures, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_cancels_every_task_before_apply() {
    let (model, gate) = gated(0);
    let mut config = config("gated");
    config.dispatch.workers = 2;
    let loader = Arc::new(MapLoader::default().with("gated", model));
    let (agent, mut applier) = Agent::start_with_loader(&config, loader).unwrap();
    let mut world = TestWorld::at(0, 0, 0).with_goblin();

    for _ in 0..5 {
        agent.dispatcher().on_game_tick(&world).unwrap();
    }
    // Both workers are inside predict; three tasks wait in the queue.
    gate.wait_entered();
    gate.wait_entered();

    agent.shutdown();
    gate.open(5);
    let stats = agent.join().await;

    assert!(applier.apply_next(&mut world).await.is_none());
    assert_eq!(applier.pump(&mut world), 0);
    assert_eq!(world.mutations(), 0);
    assert_eq!(stats.cancelled, 5);
    assert_eq!(stats.applied, 0);
}

#[tokio::test]
async fn shutdown_during_apply_lets_that_action_finish() {
    let loader = Arc::new(MapLoader::default().with("north", Fixed(2)));
    let (agent, mut applier) = Agent::start_with_loader(&config("north"), loader).unwrap();
    let agent = Arc::new(agent);
    let mut world = TestWorld::at(10, 20, 0);
    world.on_move = Some(Box::new({
        let agent = agent.clone();
        move || agent.shutdown()
    }));

    agent.dispatcher().on_game_tick(&world).unwrap();
    agent.dispatcher().on_game_tick(&world).unwrap();

    let applied = next_action(&mut applier, &mut world).await;
    assert_eq!(action_name(&applied), "move_north");
    assert!(agent.is_shut_down());
    // The move and its announcement both went out.
    assert_eq!(world.moves, vec![WorldPosition::new(10, 21, 0)]);
    assert_eq!(
        world.notices,
        vec!["Moving to WorldPoint(x=10, y=21, plane=0)".to_string()]
    );

    assert!(applier.apply_next(&mut world).await.is_none());
    assert_eq!(world.moves.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_queue_drops_the_oldest_pending_events() {
    let (model, gate) = gated(1);
    let mut config = config("gated");
    config.dispatch.queue_capacity = 2;
    let loader = Arc::new(MapLoader::default().with("gated", model));
    let (agent, mut applier) = Agent::start_with_loader(&config, loader).unwrap();
    let mut world = TestWorld::at(0, 0, 0);

    agent.dispatcher().on_game_tick(&world).unwrap();
    gate.wait_entered();
    for _ in 0..5 {
        agent.dispatcher().on_game_tick(&world).unwrap();
    }
    assert_eq!(agent.dispatcher().pending(), 2);
    assert_eq!(agent.stats().dropped, 3);

    gate.open(3);
    let mut applied = Vec::new();
    for _ in 0..3 {
        match next_action(&mut applier, &mut world).await {
            Applied::Action { task, action, .. } => {
                assert_eq!(action.as_str(), "defend");
                applied.push(task);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(applied, vec![TaskId(1), TaskId(5), TaskId(6)]);
    assert_eq!(world.interactions.len(), 3);

    let stats = agent.join().await;
    assert_eq!(stats.dispatched, 6);
    assert_eq!(stats.dropped, 3);
    assert_eq!(stats.applied, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn out_of_order_decisions_keep_their_own_snapshots() {
    // Held task answers move_north, the other move_east.
    let (model, gate) = split("x=10,", 2, 4);
    let mut config = config("split");
    config.dispatch.workers = 2;
    let loader = Arc::new(MapLoader::default().with("split", model));
    let (agent, mut applier) = Agent::start_with_loader(&config, loader).unwrap();
    let mut world = TestWorld::at(10, 20, 0);

    agent.dispatcher().on_player_moved(&world).unwrap();
    gate.wait_entered();

    world.actor.position = WorldPosition::new(50, 60, 0);
    agent.dispatcher().on_player_moved(&world).unwrap();

    let second = next_action(&mut applier, &mut world).await;
    assert_eq!(
        second,
        Applied::Action {
            task: TaskId(2),
            channel: Channel::Movement,
            action: "move_east".into(),
            outcome: ActionOutcome::Moved {
                to: WorldPosition::new(51, 60, 0)
            },
        }
    );

    // Wherever the actor is now, the held task steps from its own capture.
    world.actor.position = WorldPosition::new(0, 0, 0);
    gate.open(1);
    let first = next_action(&mut applier, &mut world).await;
    assert_eq!(
        first,
        Applied::Action {
            task: TaskId(1),
            channel: Channel::Movement,
            action: "move_north".into(),
            outcome: ActionOutcome::Moved {
                to: WorldPosition::new(10, 21, 0)
            },
        }
    );

    assert_eq!(
        world.moves,
        vec![WorldPosition::new(51, 60, 0), WorldPosition::new(10, 21, 0)]
    );
    agent.join().await;
}
