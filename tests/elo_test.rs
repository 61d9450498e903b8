//! Real-time Elo pipeline tests over finished game records.

mod common;

use chrono::Utc;
use common::{create_user, finished_game, manager};
use lexicross::db::records::{StatsRecord, UserUpdate};
use lexicross::db::Session;
use lexicross::services::elo::update_elo_for_game;

/// Mark a user as established by landing a snapshot with more than ten
/// lifetime human games
async fn make_established(session: &Session, user_id: &str) {
    let mut snapshot = StatsRecord::new(Some(user_id.to_string()), 0);
    snapshot.games = 20;
    snapshot.human_games = 20;
    snapshot.timestamp = Some(Utc::now() - chrono::Duration::days(30));
    session
        .stats()
        .put_multi(&[snapshot])
        .await
        .expect("snapshot");
}

/// Seed the legacy denormalized rating fields on a user
async fn seed_user_elo(session: &Session, user_id: &str, elo: i32) {
    session
        .users()
        .update(
            user_id,
            UserUpdate {
                elo: Some(elo),
                human_elo: Some(elo),
                manual_elo: Some(elo),
                ..Default::default()
            },
        )
        .await
        .expect("seed");
}

#[tokio::test]
async fn established_players_shift_by_ten_on_an_even_win() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "alice", "Alice").await;
    create_user(&session, "bob", "Bob").await;
    make_established(&session, "alice").await;
    make_established(&session, "bob").await;
    seed_user_elo(&session, "alice", 1200).await;
    seed_user_elo(&session, "bob", 1200).await;

    // Bob (seat 1) wins 300-250
    let game = finished_game("g1", Some("alice"), Some("bob"), 250, 300, Utc::now(), false);
    session.games().create(&game).await.expect("game");

    let alice = session.users().get("alice").await.expect("load").expect("alice");
    let bob = session.users().get("bob").await.expect("load").expect("bob");
    let update = update_elo_for_game(session.backend(), &game, Some(&alice), Some(&bob))
        .await
        .expect("elo update");

    assert_eq!(update.elo0, Some(1200));
    assert_eq!(update.elo1, Some(1200));
    assert_eq!(update.elo0_adj, Some(-10));
    assert_eq!(update.elo1_adj, Some(10));
    assert_eq!(update.human_elo0_adj, Some(-10));
    assert_eq!(update.human_elo1_adj, Some(10));
    // Non-manual game: the manual track is untouched
    assert_eq!(update.manual_elo0, None);

    let alice_rating = session
        .elo()
        .get("is_IS", "alice")
        .await
        .expect("load")
        .expect("rating");
    assert_eq!(alice_rating.human_elo, 1190);
    assert_eq!(alice_rating.elo, 1190);
    assert_eq!(alice_rating.manual_elo, 1200);
    let bob_rating = session
        .elo()
        .get("is_IS", "bob")
        .await
        .expect("load")
        .expect("rating");
    assert_eq!(bob_rating.human_elo, 1210);
    assert_eq!(bob_rating.elo, 1210);

    // The denormalized view on the users follows their own locale
    let alice = session.users().get("alice").await.expect("load").expect("alice");
    assert_eq!(alice.human_elo, 1190);
    let bob = session.users().get("bob").await.expect("load").expect("bob");
    assert_eq!(bob.human_elo, 1210);
}

#[tokio::test]
async fn beginners_use_the_larger_k_factor() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "carol", "Carol").await;
    create_user(&session, "dave", "Dave").await;

    let game = finished_game("g2", Some("carol"), Some("dave"), 300, 250, Utc::now(), false);
    session.games().create(&game).await.expect("game");

    let carol = session.users().get("carol").await.expect("load").expect("user");
    let dave = session.users().get("dave").await.expect("load").expect("user");
    let update = update_elo_for_game(session.backend(), &game, Some(&carol), Some(&dave))
        .await
        .expect("elo update");

    // Both beginners: K = 32, expected 0.5, so +/-16
    assert_eq!(update.elo0_adj, Some(16));
    assert_eq!(update.elo1_adj, Some(-16));
}

#[tokio::test]
async fn established_player_cannot_farm_beginners() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "pro", "Pro").await;
    create_user(&session, "newbie", "Newbie").await;
    make_established(&session, "pro").await;

    let game = finished_game("g3", Some("pro"), Some("newbie"), 400, 100, Utc::now(), false);
    session.games().create(&game).await.expect("game");

    let pro = session.users().get("pro").await.expect("load").expect("user");
    let newbie = session.users().get("newbie").await.expect("load").expect("user");
    let update = update_elo_for_game(session.backend(), &game, Some(&pro), Some(&newbie))
        .await
        .expect("elo update");

    // The established winner's rating is frozen; the beginner still
    // takes the loss
    assert_eq!(update.elo0_adj, Some(0));
    assert!(update.elo1_adj.expect("adjustment") < 0);
}

#[tokio::test]
async fn manual_games_update_the_manual_track() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "eva", "Eva").await;
    create_user(&session, "finn", "Finn").await;
    make_established(&session, "eva").await;
    make_established(&session, "finn").await;

    let game = finished_game("g4", Some("eva"), Some("finn"), 310, 280, Utc::now(), true);
    session.games().create(&game).await.expect("game");

    let eva = session.users().get("eva").await.expect("load").expect("user");
    let finn = session.users().get("finn").await.expect("load").expect("user");
    let update = update_elo_for_game(session.backend(), &game, Some(&eva), Some(&finn))
        .await
        .expect("elo update");

    assert_eq!(update.manual_elo0, Some(1200));
    assert_eq!(update.manual_elo0_adj, Some(10));
    assert_eq!(update.manual_elo1_adj, Some(-10));

    let eva_rating = session
        .elo()
        .get("is_IS", "eva")
        .await
        .expect("load")
        .expect("rating");
    assert_eq!(eva_rating.manual_elo, 1210);
}

#[tokio::test]
async fn zero_zero_games_record_but_do_not_adjust() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "gina", "Gina").await;
    create_user(&session, "hal", "Hal").await;

    let game = finished_game("g5", Some("gina"), Some("hal"), 0, 0, Utc::now(), false);
    session.games().create(&game).await.expect("game");

    let gina = session.users().get("gina").await.expect("load").expect("user");
    let hal = session.users().get("hal").await.expect("load").expect("user");
    let update = update_elo_for_game(session.backend(), &game, Some(&gina), Some(&hal))
        .await
        .expect("elo update");

    assert_eq!(update.elo0, Some(1200));
    assert_eq!(update.elo0_adj, Some(0));
    assert_eq!(update.elo1_adj, Some(0));

    // Rating rows were still written with the default values
    let rating = session
        .elo()
        .get("is_IS", "gina")
        .await
        .expect("load")
        .expect("rating");
    assert_eq!(rating.elo, 1200);
    assert_eq!(rating.human_elo, 1200);
    assert_eq!(rating.manual_elo, 1200);
}
