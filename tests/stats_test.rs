//! Nightly pipeline tests: accumulation, idempotence, deadline resume
//! and the top-100 rebuild with sentinel rows.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{create_user, finished_game, manager};
use lexicross::db::records::RatingKind;
use lexicross::db::Session;
use lexicross::services::stats::{StatsService, RATINGS_PROCTYPE, STATS_PROCTYPE};

struct Window {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

fn window() -> Window {
    let to = Utc::now();
    Window {
        from: to - Duration::days(1),
        to,
    }
}

async fn seed_games(session: &Session, window: &Window, count: usize) {
    create_user(session, "a", "Anna").await;
    create_user(session, "b", "Bjorn").await;
    for ix in 0..count {
        let ts = window.from + Duration::minutes((ix as i64 + 1) * 2);
        let (s0, s1) = if ix % 2 == 0 { (300, 250) } else { (240, 260) };
        let game = finished_game(&format!("g{ix}"), Some("a"), Some("b"), s0, s1, ts, false);
        session.games().create(&game).await.expect("game");
    }
}

#[tokio::test]
async fn stats_run_lands_one_snapshot_per_user() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let window = window();
    seed_games(&session, &window, 1).await;

    let service = StatsService::new();
    let info = service
        .run_stats(&session, window.from, window.to, None)
        .await
        .expect("run");
    assert!(info.completed);
    assert_eq!(info.games_processed, 1);
    assert_eq!(info.users_touched, 2);

    let snapshots = session.stats().list_at(window.to).await.expect("list");
    assert_eq!(snapshots.len(), 2);
    let a = snapshots
        .iter()
        .find(|s| s.user_id.as_deref() == Some("a"))
        .expect("snapshot for a");
    // One win as a beginner: K = 32, expected 0.5 -> +16
    assert_eq!(a.games, 1);
    assert_eq!(a.human_games, 1);
    assert_eq!(a.wins, 1);
    assert_eq!(a.score, 300);
    assert_eq!(a.score_against, 250);
    assert_eq!(a.elo, 1216);
    assert_eq!(a.human_elo, 1216);

    // The authoritative Elo state is rewritten onto the game
    let game = session.games().get("g0").await.expect("load").expect("game");
    assert_eq!(game.elo0, Some(1200));
    assert_eq!(game.elo0_adj, Some(16));
    assert_eq!(game.elo1_adj, Some(-16));

    // The denormalized user fields follow the authoritative values
    let user = session.users().get("a").await.expect("load").expect("user");
    assert_eq!(user.elo, 1216);
}

#[tokio::test]
async fn rerunning_the_same_window_is_idempotent() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let window = window();
    seed_games(&session, &window, 4).await;

    let service = StatsService::new();
    let first = service
        .run_stats(&session, window.from, window.to, None)
        .await
        .expect("first run");
    assert!(first.completed);
    let mut snapshots_first = session.stats().list_at(window.to).await.expect("list");
    snapshots_first.sort_by(|a, b| a.dict_key().cmp(&b.dict_key()));

    let second = service
        .run_stats(&session, window.from, window.to, None)
        .await
        .expect("second run");
    assert!(second.completed);
    let mut snapshots_second = session.stats().list_at(window.to).await.expect("list");
    snapshots_second.sort_by(|a, b| a.dict_key().cmp(&b.dict_key()));

    assert_eq!(snapshots_first.len(), snapshots_second.len());
    for (lhs, rhs) in snapshots_first.iter().zip(snapshots_second.iter()) {
        assert_eq!(lhs.dict_key(), rhs.dict_key());
        assert_eq!(lhs.games, rhs.games);
        assert_eq!(lhs.elo, rhs.elo);
        assert_eq!(lhs.human_elo, rhs.human_elo);
        assert_eq!(lhs.wins, rhs.wins);
        assert_eq!(lhs.losses, rhs.losses);
    }
}

#[tokio::test]
async fn interrupted_run_resumes_to_the_same_result() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let window = window();
    seed_games(&session, &window, 6).await;

    let service = StatsService::new();

    // A deadline in the past stops the run before any game
    let info = service
        .run_stats(
            &session,
            window.from,
            window.to,
            Some(Utc::now() - Duration::seconds(1)),
        )
        .await
        .expect("interrupted run");
    assert!(!info.completed);
    assert!(info.games_processed < 6);

    // The interruption is on record
    let last = session
        .completions()
        .newest_for_proctype(STATS_PROCTYPE)
        .await
        .expect("log")
        .expect("entry");
    assert!(!last.success);

    // Re-invoking with the original window completes the job
    let info = service
        .run_stats(&session, window.from, window.to, None)
        .await
        .expect("resumed run");
    assert!(info.completed);

    let snapshots = session.stats().list_at(window.to).await.expect("list");
    assert_eq!(snapshots.len(), 2);
    let a = snapshots
        .iter()
        .find(|s| s.user_id.as_deref() == Some("a"))
        .expect("snapshot");
    // All six games are reflected exactly once
    assert_eq!(a.games, 6);
    assert_eq!(a.wins, 3);
    assert_eq!(a.losses, 3);

    let success = session
        .completions()
        .newest_for_proctype(STATS_PROCTYPE)
        .await
        .expect("log")
        .expect("entry");
    assert!(success.success);
}

#[tokio::test]
async fn ratings_rebuild_fills_all_ranks() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let window = window();
    seed_games(&session, &window, 2).await;

    let service = StatsService::new();
    service
        .run_stats(&session, window.from, window.to, None)
        .await
        .expect("stats");
    service
        .rebuild_ratings(&session)
        .await
        .expect("ratings");

    for kind in [RatingKind::All, RatingKind::Human, RatingKind::Manual] {
        let rows = session.ratings().list_rating(kind).await.expect("rows");
        assert_eq!(rows.len(), 100, "kind {:?}", kind);
        for (ix, row) in rows.iter().enumerate() {
            assert_eq!(row.rank, (ix + 1) as i32);
        }
    }

    // Two real entries, the rest sentinels
    let rows = session
        .ratings()
        .list_rating(RatingKind::All)
        .await
        .expect("rows");
    assert!(rows[0].user_id.is_some());
    assert!(rows[1].user_id.is_some());
    assert_eq!(rows[2].user_id, None);
    assert_eq!(rows[2].robot_level, -1);
    assert_eq!(rows[2].games, -1);

    let completion = session
        .completions()
        .newest_for_proctype(RATINGS_PROCTYPE)
        .await
        .expect("log")
        .expect("entry");
    assert!(completion.success);
}

#[tokio::test]
async fn games_outside_the_window_are_ignored() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let window = window();
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    // One game before the window, one inside, one after
    let before = finished_game(
        "before",
        Some("a"),
        Some("b"),
        300,
        200,
        window.from - Duration::hours(1),
        false,
    );
    let inside = finished_game(
        "inside",
        Some("a"),
        Some("b"),
        300,
        200,
        window.from + Duration::hours(1),
        false,
    );
    let after = finished_game(
        "after",
        Some("a"),
        Some("b"),
        300,
        200,
        window.to + Duration::hours(1),
        false,
    );
    for game in [&before, &inside, &after] {
        session.games().create(game).await.expect("game");
    }

    let service = StatsService::new();
    let info = service
        .run_stats(&session, window.from, window.to, None)
        .await
        .expect("run");
    assert_eq!(info.games_processed, 1);
}
