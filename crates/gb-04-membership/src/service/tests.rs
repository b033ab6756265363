use super::*;
use crate::adapters::MemoryControlPlane;
use crate::domain::MembershipError;
use crate::ports::ControlPlaneError;
use gb_01_negotiator::MemoryNetwork;
use serde_json::json;
use shared_types::Entry;
use std::time::Duration;

struct Player {
    handle: RoomHandle,
    events: mpsc::UnboundedReceiver<RoomEvent>,
}

struct World {
    control: MemoryControlPlane,
    network: MemoryNetwork,
}

impl World {
    fn new() -> Self {
        Self {
            control: MemoryControlPlane::new(),
            network: MemoryNetwork::new(),
        }
    }

    fn player(&self, name: &str, max_players: usize) -> Player {
        let config = MembershipConfig {
            max_players,
            ..MembershipConfig::default()
        };
        let (handle, events) = spawn_room(
            name.into(),
            Arc::new(self.control.clone()),
            self.network.clone(),
            config,
        );
        Player { handle, events }
    }
}

async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Wait until `player` has `peers` links and every one finished key exchange.
async fn wait_meshed(player: &Player, peers: usize) {
    let handle = player.handle.clone();
    wait_until("mesh", || {
        let handle = handle.clone();
        async move {
            let linked = handle.peers().await.unwrap().len();
            let ready = handle.stats().await.unwrap().map_or(0, |s| s.ready);
            linked == peers && ready == peers + 1
        }
    })
    .await;
}

async fn next_commit(player: &mut Player) -> Entry {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), player.events.recv()).await {
            Ok(Some(RoomEvent::Committed(entry))) => return entry,
            Ok(Some(_)) => continue,
            other => panic!("no commit: {other:?}"),
        }
    }
}

/// Skip commits below `index`; earlier moves may still be queued.
async fn commit_at(player: &mut Player, index: u64) -> Entry {
    loop {
        let entry = next_commit(player).await;
        if entry.index >= index {
            return entry;
        }
    }
}

async fn next_matching(player: &mut Player, wanted: &RoomEvent) {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), player.events.recv()).await {
            Ok(Some(event)) if &event == wanted => return,
            Ok(Some(_)) => continue,
            other => panic!("expected {wanted:?}, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_players_link_and_commit() {
    let world = World::new();
    let mut alice = world.player("alice", 4);
    let mut bob = world.player("bob", 4);

    let info = alice.handle.create("room-1").await.unwrap();
    assert_eq!(info.host.as_str(), "alice");
    let host = bob.handle.join("room-1").await.unwrap();
    assert_eq!(host.as_str(), "alice");

    wait_meshed(&alice, 1).await;
    wait_meshed(&bob, 1).await;

    alice
        .handle
        .broadcast("MOVE", json!({"san": "e4"}))
        .await
        .unwrap();

    let at_alice = next_commit(&mut alice).await;
    let at_bob = next_commit(&mut bob).await;
    assert_eq!(at_alice, at_bob);
    assert_eq!(at_alice.index, 1);
    let data = at_alice.data.unwrap();
    assert_eq!(data.from.as_str(), "alice");
    assert_eq!(data.kind, "MOVE");
    assert_eq!(data.payload, json!({"san": "e4"}));
}

#[tokio::test(start_paused = true)]
async fn test_third_player_meshes_with_everyone() {
    let world = World::new();
    let alice = world.player("alice", 4);
    let bob = world.player("bob", 4);
    let carol = world.player("carol", 4);

    alice.handle.create("room-1").await.unwrap();
    bob.handle.join("room-1").await.unwrap();
    wait_meshed(&bob, 1).await;
    carol.handle.join("room-1").await.unwrap();

    wait_meshed(&alice, 2).await;
    wait_meshed(&bob, 2).await;
    wait_meshed(&carol, 2).await;

    let mut bob_peers = bob.handle.peers().await.unwrap();
    bob_peers.sort();
    assert_eq!(bob_peers, vec!["alice".into(), "carol".into()]);
    assert_eq!(
        world.control.roster("room-1"),
        vec!["alice".into(), "bob".into(), "carol".into()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_moves_from_every_player_share_one_log() {
    let world = World::new();
    let mut players = vec![
        world.player("alice", 4),
        world.player("bob", 4),
        world.player("carol", 4),
    ];
    players[0].handle.create("room-1").await.unwrap();
    players[1].handle.join("room-1").await.unwrap();
    wait_meshed(&players[1], 1).await;
    players[2].handle.join("room-1").await.unwrap();
    for player in &players {
        wait_meshed(player, 2).await;
    }

    for (turn, san) in ["e4", "e5", "Nf3"].into_iter().enumerate() {
        let mover = &mut players[turn];
        mover
            .handle
            .broadcast("MOVE", json!({ "san": san }))
            .await
            .unwrap();
        let index = turn as u64 + 1;
        assert_eq!(commit_at(mover, index).await.index, index);
    }

    let expected = players[0].handle.entries().await.unwrap();
    assert_eq!(expected.len(), 4);
    for player in &players[1..] {
        let handle = player.handle.clone();
        let expected = expected.clone();
        wait_until("log agreement", || {
            let handle = handle.clone();
            let expected = expected.clone();
            async move { handle.entries().await.unwrap() == expected }
        })
        .await;
    }
    let authors: Vec<String> = expected[1..]
        .iter()
        .map(|e| e.data.as_ref().unwrap().from.to_string())
        .collect();
    assert_eq!(authors, vec!["alice", "bob", "carol"]);
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_receives_history() {
    let world = World::new();
    let mut alice = world.player("alice", 4);
    let bob = world.player("bob", 4);

    alice.handle.create("room-1").await.unwrap();
    bob.handle.join("room-1").await.unwrap();
    wait_meshed(&alice, 1).await;
    wait_meshed(&bob, 1).await;

    for san in ["e4", "e5"] {
        alice
            .handle
            .broadcast("MOVE", json!({ "san": san }))
            .await
            .unwrap();
        next_commit(&mut alice).await;
    }

    let mut carol = world.player("carol", 4);
    carol.handle.join("room-1").await.unwrap();
    let first = next_commit(&mut carol).await;
    let second = next_commit(&mut carol).await;
    assert_eq!((first.index, second.index), (1, 2));

    let expected = alice.handle.entries().await.unwrap();
    assert_eq!(carol.handle.entries().await.unwrap(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_full_room_turns_joiner_away() {
    let world = World::new();
    let alice = world.player("alice", 2);
    let bob = world.player("bob", 2);
    let mut carol = world.player("carol", 2);

    alice.handle.create("duel").await.unwrap();
    bob.handle.join("duel").await.unwrap();
    wait_meshed(&alice, 1).await;

    carol.handle.join("duel").await.unwrap();
    next_matching(&mut carol, &RoomEvent::RoomFull).await;
    assert_eq!(alice.handle.peers().await.unwrap(), vec!["bob".into()]);
    assert!(carol.handle.peers().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_departure_is_seen_by_everyone() {
    let world = World::new();
    let mut alice = world.player("alice", 4);
    let mut bob = world.player("bob", 4);
    let carol = world.player("carol", 4);

    alice.handle.create("room-1").await.unwrap();
    bob.handle.join("room-1").await.unwrap();
    wait_meshed(&bob, 1).await;
    carol.handle.join("room-1").await.unwrap();
    wait_meshed(&carol, 2).await;

    carol.handle.close();
    let left = RoomEvent::PlayerLeft("carol".into());
    next_matching(&mut alice, &left).await;
    next_matching(&mut bob, &left).await;

    wait_meshed(&alice, 1).await;
    assert_eq!(
        world.control.roster("room-1"),
        vec!["alice".into(), "bob".into()]
    );

    // Two ready participants remain; a move still commits.
    alice
        .handle
        .broadcast("MOVE", json!({"san": "Nf3"}))
        .await
        .unwrap();
    assert_eq!(next_commit(&mut bob).await.index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_requires_a_room() {
    let world = World::new();
    let alice = world.player("alice", 2);
    assert!(matches!(
        alice.handle.broadcast("MOVE", json!({})).await,
        Err(MembershipError::NotInRoom)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_join_unknown_room_fails() {
    let world = World::new();
    let bob = world.player("bob", 2);
    assert!(matches!(
        bob.handle.join("nowhere").await,
        Err(MembershipError::ControlPlane(ControlPlaneError::RoomNotFound(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_second_room_rejected() {
    let world = World::new();
    let alice = world.player("alice", 2);
    alice.handle.create("room-1").await.unwrap();
    assert!(matches!(
        alice.handle.create("room-2").await,
        Err(MembershipError::AlreadyInRoom(room)) if room == "room-1"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_close_ends_the_task() {
    let world = World::new();
    let mut alice = world.player("alice", 2);
    alice.handle.create("room-1").await.unwrap();

    alice.handle.close();
    next_matching(&mut alice, &RoomEvent::Closed).await;
    assert!(matches!(
        alice.handle.peers().await,
        Err(MembershipError::Closed)
    ));
    assert!(world.control.roster("room-1").is_empty());
}
