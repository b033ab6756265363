//! Link failures and roster repair.

use super::support::{commit_at, eventually, expect_event, wait_meshed, World, ROOM};
use gb_04_membership::{ControlPlane, RoomEvent};
use serde_json::json;
use shared_types::ParticipantName;
use std::time::Duration;

fn name(s: &str) -> ParticipantName {
    ParticipantName::new(s)
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_joiner_is_abandoned() {
    let world = World::new();
    world.network.block("ann", "ben");

    let ann = world.spawn("ann");
    let ben = world.spawn("ben");
    ann.handle.create(ROOM).await.unwrap();
    ben.handle.join(ROOM).await.unwrap();

    // Three signaling attempts, then the 15s session deadline on both sides.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(ann.handle.peers().await.unwrap().is_empty());
    assert!(ben.handle.peers().await.unwrap().is_empty());
    assert_eq!(world.control.roster(ROOM), vec![name("ann")]);

    // The seat is free again for a reachable player.
    let cat = world.spawn("cat");
    cat.handle.join(ROOM).await.unwrap();
    wait_meshed(&ann, 1).await;
    assert_eq!(ann.handle.peers().await.unwrap(), vec![name("cat")]);
}

#[tokio::test(start_paused = true)]
async fn test_severed_link_still_converges() {
    let world = World::new();
    let mut players = world.meshed_room(&["ann", "ben", "cat"]).await;

    world.network.sever(&name("ann"), &name("ben"));
    expect_event(&mut players[0], &RoomEvent::PlayerLeft(name("ben"))).await;
    expect_event(&mut players[1], &RoomEvent::PlayerLeft(name("ann"))).await;

    players[0]
        .handle
        .broadcast("MOVE", json!({"san": "e4"}))
        .await
        .unwrap();

    // ann and ben each count two ready participants; cat still counts three
    // and needs ben's approval, which only reaches it over ben's own link.
    let mut hashes = Vec::new();
    for player in players.iter_mut() {
        hashes.push(commit_at(player, 1).await.hash);
    }
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_peers_outlive_the_host() {
    let world = World::new();
    let mut players = world.meshed_room(&["ann", "ben", "cat"]).await;

    players[0].handle.close();
    expect_event(&mut players[1], &RoomEvent::PlayerLeft(name("ann"))).await;
    expect_event(&mut players[2], &RoomEvent::PlayerLeft(name("ann"))).await;

    players[1]
        .handle
        .broadcast("MOVE", json!({"san": "e4"}))
        .await
        .unwrap();
    let entry = commit_at(&mut players[2], 1).await;
    assert_eq!(entry.data.unwrap().from, name("ben"));
}

#[tokio::test(start_paused = true)]
async fn test_roster_drift_is_repaired() {
    let world = World::new();
    let _players = world.meshed_room(&["ann", "ben"]).await;
    assert_eq!(world.control.roster(ROOM), vec![name("ann"), name("ben")]);

    // Missed events: ben vanished from the roster, a ghost appeared.
    world.control.player_remove(ROOM, &name("ben")).await.unwrap();
    world.control.player_add(ROOM, &name("ghost")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(361)).await;
    let control = world.control.clone();
    eventually("roster repair", || {
        let control = control.clone();
        async move { control.roster(ROOM) == vec![name("ann"), name("ben")] }
    })
    .await;
}
