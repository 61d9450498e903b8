//! User service tests: lookups, search, the balanced similar-Elo
//! neighborhood and the account deletion cascade.

mod common;

use chrono::Utc;
use common::{create_user, finished_game, manager};
use lexicross::db::records::{PrefsMap, UserUpdate};
use lexicross::db::Session;
use lexicross::services::UserService;
use serde_json::Value;

async fn set_human_elo(session: &Session, user_id: &str, elo: i32) {
    session
        .users()
        .update(
            user_id,
            UserUpdate {
                human_elo: Some(elo),
                // Only players with at least one game enter the lists
                highest_score: Some(100),
                ..Default::default()
            },
        )
        .await
        .expect("update");
}

#[tokio::test]
async fn nickname_and_fullname_stay_lowercased() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();
    create_user(&session, "u1", "SkraflKing").await;

    let user = session.users().get("u1").await.expect("load").expect("user");
    assert_eq!(user.nick_lc, "skraflking");

    let mut prefs = user.prefs.clone();
    prefs.insert(
        "fullName".to_string(),
        Value::String("Jon JONSSON".to_string()),
    );
    users
        .update(
            &session,
            "u1",
            UserUpdate {
                nickname: Some("WordWizard".to_string()),
                prefs: Some(prefs),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let user = session.users().get("u1").await.expect("load").expect("user");
    assert_eq!(user.nickname, "WordWizard");
    assert_eq!(user.nick_lc, "wordwizard");
    assert_eq!(user.name_lc, "jon jonsson");
}

#[tokio::test]
async fn prefix_search_covers_nick_and_name_without_duplicates() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();
    create_user(&session, "u1", "Walrus").await;
    create_user(&session, "u2", "Wanda").await;
    create_user(&session, "u3", "Zebra").await;

    // u3 has a full name matching the prefix
    let mut prefs = PrefsMap::new();
    prefs.insert(
        "fullName".to_string(),
        Value::String("Walter Zebra".to_string()),
    );
    users
        .update(
            &session,
            "u3",
            UserUpdate {
                prefs: Some(prefs),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let result = users
        .list_prefix(&session, "wa", None, None)
        .await
        .expect("search");
    let ids: Vec<&str> = result.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&"u1"));
    assert!(ids.contains(&"u2"));
    assert!(ids.contains(&"u3"));

    // Inactive users never appear
    users
        .update(
            &session,
            "u2",
            UserUpdate {
                inactive: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    let result = users
        .list_prefix(&session, "wa", None, None)
        .await
        .expect("search");
    assert_eq!(result.len(), 2);
}

#[tokio::test]
async fn email_lookup_prefers_rated_active_users() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();

    // Two active accounts sharing an address (legacy situation); the
    // one with a positive Elo wins
    create_user(&session, "old", "Old").await;
    create_user(&session, "new", "New").await;
    let shared = "shared@example.com";
    for id in ["old", "new"] {
        session
            .users()
            .update(
                id,
                UserUpdate {
                    email: Some(shared.to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
    }
    session
        .users()
        .update(
            "old",
            UserUpdate {
                elo: Some(1250),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let found = users
        .get_by_email(&session, shared)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(found.id, "old");
}

#[tokio::test]
async fn similar_elo_is_balanced_and_sorted() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();

    let ratings = [
        ("p1", 1000),
        ("p2", 1100),
        ("p3", 1180),
        ("p4", 1250),
        ("p5", 1300),
        ("p6", 1400),
        ("p7", 1500),
    ];
    for (id, elo) in ratings {
        create_user(&session, id, id).await;
        set_human_elo(&session, id, elo).await;
    }

    let result = users
        .list_similar_elo(&session, 1200, None, 6)
        .await
        .expect("similar");
    assert!(result.len() <= 6);
    // Three below the target, three at or above
    assert_eq!(
        result,
        vec![
            "p1".to_string(),
            "p2".to_string(),
            "p3".to_string(),
            "p4".to_string(),
            "p5".to_string(),
            "p6".to_string(),
        ]
    );

    // Monotonically non-decreasing in human Elo
    let loaded = session
        .users()
        .get_multi(&result)
        .await
        .expect("load");
    let elos: Vec<i32> = loaded
        .into_iter()
        .map(|user| user.expect("present").human_elo)
        .collect();
    for pair in elos.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[tokio::test]
async fn similar_elo_handles_a_thin_upper_range() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();

    for (id, elo) in [("q1", 900), ("q2", 1000), ("q3", 1100), ("q4", 1150)] {
        create_user(&session, id, id).await;
        set_human_elo(&session, id, elo).await;
    }

    // Nobody is rated at or above the target; the whole list comes
    // from below
    let result = users
        .list_similar_elo(&session, 2000, None, 4)
        .await
        .expect("similar");
    assert_eq!(result.len(), 4);
    assert_eq!(result[0], "q1");
    assert_eq!(result[3], "q4");
}

#[tokio::test]
async fn account_deletion_cascades_but_keeps_games() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();
    create_user(&session, "u", "Uggi").await;
    create_user(&session, "f1", "FriendOne").await;
    create_user(&session, "f2", "FriendTwo").await;

    // Two favorites, one block, three challenges, one snapshot
    users.add_favorite(&session, "u", "f1").await.expect("favorite");
    users.add_favorite(&session, "u", "f2").await.expect("favorite");
    users.block(&session, "u", "f1").await.expect("block");
    let prefs = PrefsMap::new();
    session
        .challenges()
        .add_relation("u", "f1", &prefs)
        .await
        .expect("challenge");
    session
        .challenges()
        .add_relation("u", "f2", &prefs)
        .await
        .expect("challenge");
    session
        .challenges()
        .add_relation("f1", "u", &prefs)
        .await
        .expect("challenge");
    let mut snapshot = lexicross::db::records::StatsRecord::new(Some("u".to_string()), 0);
    snapshot.timestamp = Some(Utc::now());
    session
        .stats()
        .put_multi(&[snapshot])
        .await
        .expect("snapshot");
    session
        .elo()
        .upsert(&lexicross::db::records::EloRecord {
            user_id: "u".to_string(),
            locale: "is_IS".to_string(),
            elo: 1234,
            human_elo: 1234,
            manual_elo: 1234,
            timestamp: Utc::now(),
        })
        .await
        .expect("rating");

    // Four games, two still in progress
    for (ix, over) in [(0, true), (1, true), (2, false), (3, false)] {
        let mut game = finished_game(
            &format!("game-{ix}"),
            Some("u"),
            Some("f1"),
            100,
            90,
            Utc::now(),
            false,
        );
        game.over = over;
        session.games().create(&game).await.expect("game");
    }

    users.delete_account(&session, "u").await.expect("delete");

    assert!(session.users().get("u").await.expect("load").is_none());
    assert!(session
        .favorites()
        .list_favorites("u", 100)
        .await
        .expect("favorites")
        .is_empty());
    assert!(!session
        .blocks()
        .is_blocking("u", "f1")
        .await
        .expect("blocks"));
    assert!(session
        .challenges()
        .list_issued("u", 20)
        .await
        .expect("challenges")
        .is_empty());
    assert!(session
        .challenges()
        .list_received("u", 20)
        .await
        .expect("challenges")
        .is_empty());
    assert!(session
        .stats()
        .newest_for_user("u")
        .await
        .expect("stats")
        .is_none());
    assert!(session.elo().get("is_IS", "u").await.expect("elo").is_none());

    // The games survive with the seat nulled
    for ix in 0..4 {
        let game = session
            .games()
            .get(&format!("game-{ix}"))
            .await
            .expect("load")
            .expect("game kept");
        assert_eq!(game.player0_id, None);
        assert_eq!(game.player1_id.as_deref(), Some("f1"));
        assert_eq!(game.score0, 100);
    }
}

#[tokio::test]
async fn deleting_a_missing_account_is_reported() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let users = UserService::new();
    let result = users.delete_account(&session, "ghost").await;
    assert!(matches!(result, Err(lexicross::CoreError::NotFound)));
}
