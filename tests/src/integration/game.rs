//! Moves agreed across the mesh.

use super::support::{commit_at, eventually, stats, World};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_four_players_agree_on_every_move() {
    let world = World::new();
    let mut players = world.meshed_room(&["ann", "ben", "cat", "dan"]).await;

    let moves = ["d4", "Nf6", "c4", "e6", "Nc3", "Bb4"];
    for (turn, san) in moves.iter().enumerate() {
        let mover = &mut players[turn % 4];
        mover
            .handle
            .broadcast("MOVE", json!({ "san": san }))
            .await
            .unwrap();
        commit_at(mover, turn as u64 + 1).await;
    }

    let reference = players[0].handle.entries().await.unwrap();
    assert_eq!(reference.len(), moves.len() + 1);
    for player in &players[1..] {
        let handle = player.handle.clone();
        let reference = reference.clone();
        eventually("log agreement", || {
            let handle = handle.clone();
            let reference = reference.clone();
            async move { handle.entries().await.unwrap() == reference }
        })
        .await;
    }

    for pair in reference.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].hash);
        assert_eq!(pair[1].index, pair[0].index + 1);
    }

    let head = reference.last().unwrap();
    for player in &players {
        let snapshot = stats(player).await;
        assert_eq!(snapshot.ready, 4);
        assert_eq!(snapshot.quorum, 3);
        assert_eq!(snapshot.head_index, head.index);
        assert_eq!(snapshot.head_hash, head.hash);
    }
}

#[tokio::test(start_paused = true)]
async fn test_proposals_queue_behind_pending_move() {
    let world = World::new();
    let mut players = world.meshed_room(&["ann", "ben"]).await;

    for san in ["e4", "d4", "c4"] {
        players[0]
            .handle
            .broadcast("MOVE", json!({ "san": san }))
            .await
            .unwrap();
    }

    let mut played = Vec::new();
    for index in 1..=3 {
        let entry = commit_at(&mut players[1], index).await;
        played.push(entry.data.unwrap().payload["san"].clone());
    }
    assert_eq!(played, vec![json!("e4"), json!("d4"), json!("c4")]);
}

#[tokio::test(start_paused = true)]
async fn test_latecomer_replays_history_then_votes() {
    let world = World::new();
    let mut players = world.meshed_room(&["ann", "ben"]).await;

    for (turn, san) in ["e4", "c5"].iter().enumerate() {
        let mover = &mut players[turn];
        mover
            .handle
            .broadcast("MOVE", json!({ "san": san }))
            .await
            .unwrap();
        commit_at(mover, turn as u64 + 1).await;
    }

    let mut cat = world.spawn("cat");
    cat.handle.join(super::support::ROOM).await.unwrap();
    assert_eq!(commit_at(&mut cat, 2).await.index, 2);
    super::support::wait_meshed(&cat, 2).await;

    // Three ready participants now; cat's approval is required.
    cat.handle
        .broadcast("MOVE", json!({ "san": "Nf3" }))
        .await
        .unwrap();
    let entry = commit_at(&mut players[0], 3).await;
    assert_eq!(entry.data.unwrap().from.as_str(), "cat");
}
