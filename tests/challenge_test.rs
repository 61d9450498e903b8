//! Matchmaking tests: the challenge graph and the accept handoff.

mod common;

use common::{create_user, game_service, manager};
use lexicross::db::records::PrefsMap;
use lexicross::error::CoreError;
use lexicross::services::{ChallengeService, NullNotifier};
use serde_json::Value;
use std::sync::Arc;

fn challenge_service() -> ChallengeService {
    ChallengeService::new(Arc::new(NullNotifier))
}

fn timed_prefs(minutes: i64) -> PrefsMap {
    let mut prefs = PrefsMap::new();
    prefs.insert("duration".to_string(), Value::from(minutes));
    prefs
}

#[tokio::test]
async fn issue_list_and_decline() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let challenges = challenge_service();
    let key = challenges
        .issue(&session, "a", "b", &timed_prefs(25))
        .await
        .expect("issue");

    let issued = challenges
        .list_issued(&session, "a", None)
        .await
        .expect("list");
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].user_id, "b");
    assert_eq!(issued[0].key, key);

    let received = challenges
        .list_received(&session, "b", None)
        .await
        .expect("list");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].user_id, "a");

    let prefs = challenges
        .decline(&session, "a", "b", Some(&key))
        .await
        .expect("decline")
        .expect("prefs returned");
    assert_eq!(prefs.get("duration").and_then(Value::as_i64), Some(25));

    assert!(challenges
        .list_issued(&session, "a", None)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn concurrent_challenges_are_disambiguated_by_key() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let challenges = challenge_service();
    let key_timed = challenges
        .issue(&session, "a", "b", &timed_prefs(15))
        .await
        .expect("issue");
    let key_untimed = challenges
        .issue(&session, "a", "b", &PrefsMap::new())
        .await
        .expect("issue");
    assert_ne!(key_timed, key_untimed);

    let prefs = challenges
        .retract(&session, "a", "b", Some(&key_timed))
        .await
        .expect("retract")
        .expect("prefs");
    assert_eq!(prefs.get("duration").and_then(Value::as_i64), Some(15));

    // The untimed challenge is still outstanding
    let issued = challenges
        .list_issued(&session, "a", None)
        .await
        .expect("list");
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].key, key_untimed);
}

#[tokio::test]
async fn accept_creates_the_game_and_removes_the_edge() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let challenges = challenge_service();
    let games = game_service();
    let key = challenges
        .issue(&session, "a", "b", &timed_prefs(25))
        .await
        .expect("issue");

    let game = challenges
        .accept(&session, &games, "a", "b", Some(&key))
        .await
        .expect("accept");

    // The game carries the challenge preferences and both players
    assert_eq!(game.duration_minutes(), 25);
    let mut ids: Vec<Option<String>> = game.player_ids.to_vec();
    ids.sort();
    assert_eq!(
        ids,
        vec![Some("a".to_string()), Some("b".to_string())]
    );

    // The challenge edge is gone
    assert!(!challenges
        .has_challenge(&session, "a", "b")
        .await
        .expect("check"));

    // The stored game is live
    let record = session
        .games()
        .get(&game.uuid)
        .await
        .expect("load")
        .expect("present");
    assert!(!record.over);

    // A second accept of the same challenge fails cleanly
    let result = challenges.accept(&session, &games, "a", "b", Some(&key)).await;
    assert!(matches!(result, Err(CoreError::IllegalState(_))));
}

#[tokio::test]
async fn blocked_users_cannot_be_challenged() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    session.blocks().block_user("b", "a").await.expect("block");
    let challenges = challenge_service();
    let result = challenges.issue(&session, "a", "b", &PrefsMap::new()).await;
    assert!(matches!(result, Err(CoreError::Forbidden)));
}
