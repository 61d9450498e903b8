//! Game lifecycle tests: robot games, resignation, stale-move
//! rejection, turn ordering invariants, finalization accounting and
//! zombie entries.

mod common;

use common::{create_user, game_service, manager};
use lexicross::db::records::PrefsMap;
use lexicross::error::CoreError;
use lexicross::services::game::moves::PlayedMove;

#[tokio::test]
async fn robot_game_resigned_on_first_move_leaves_ratings_unchanged() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), None, 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");

    // Resign immediately; if the robot seat moved first its pass is
    // already on record
    let mcount = game.num_moves();
    let outcome = games
        .submit_move(&session, &game.uuid, "a", mcount, PlayedMove::Resign)
        .await
        .expect("resignation");
    assert!(outcome.game.state.is_game_over());

    let record = session
        .games()
        .get(&game.uuid)
        .await
        .expect("load")
        .expect("present");
    assert!(record.over);
    // Pre-game ratings recorded, adjustments zero
    assert_eq!(record.elo0, Some(1200));
    assert_eq!(record.elo1, Some(1200));
    assert_eq!(record.elo0_adj, Some(0));
    assert_eq!(record.elo1_adj, Some(0));
    // Human ratings are never recorded for robot games
    assert_eq!(record.human_elo0, None);

    // The player's locale rating row exists and is unchanged
    let rating = session
        .elo()
        .get("is_IS", "a")
        .await
        .expect("load")
        .expect("rating row");
    assert_eq!(rating.elo, 1200);
    assert_eq!(rating.human_elo, 1200);
    assert_eq!(rating.manual_elo, 1200);

    // The robot's rating is unchanged too
    let robot_elo = session
        .robots()
        .get_elo("is_IS", 0)
        .await
        .expect("load")
        .expect("robot row");
    assert_eq!(robot_elo, 1200);
}

#[tokio::test]
async fn stale_move_count_is_rejected_without_effect() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), Some("b"), 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");
    let mover = game.player_id_to_move().expect("human game").to_string();

    let result = games
        .submit_move(&session, &game.uuid, &mover, 5, PlayedMove::Pass)
        .await;
    assert!(matches!(result, Err(CoreError::Conflict(_))));

    // No change to the game
    let record = session
        .games()
        .get(&game.uuid)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(record.moves.len(), 0);
    assert!(!record.over);
}

#[tokio::test]
async fn turn_order_is_enforced() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), Some("b"), 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");
    let mover = game.player_id_to_move().expect("human game").to_string();
    let waiter = if mover == "a" { "b" } else { "a" };

    let result = games
        .submit_move(&session, &game.uuid, waiter, 0, PlayedMove::Pass)
        .await;
    assert!(matches!(result, Err(CoreError::IllegalState(_))));

    let result = games
        .submit_move(&session, &game.uuid, "stranger", 0, PlayedMove::Pass)
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden)));
}

#[tokio::test]
async fn to_move_tracks_the_move_list() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), Some("b"), 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");

    for expected_count in 0..4usize {
        let record = session
            .games()
            .get(&game.uuid)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(record.moves.len(), expected_count);
        assert_eq!(record.to_move as usize, record.moves.len() % 2);
        let mover = record.to_move as usize;
        let mover_id = [&record.player0_id, &record.player1_id][mover]
            .clone()
            .expect("human");
        games
            .submit_move(
                &session,
                &game.uuid,
                &mover_id,
                expected_count,
                PlayedMove::Pass,
            )
            .await
            .expect("pass");
    }

    // Move timestamps never decrease
    let record = session
        .games()
        .get(&game.uuid)
        .await
        .expect("load")
        .expect("present");
    for pair in record.moves.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn pass_run_finalizes_with_rack_deductions_and_zombie() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), Some("b"), 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");

    let mut last_mover = String::new();
    for count in 0..6usize {
        let record = session
            .games()
            .get(&game.uuid)
            .await
            .expect("load")
            .expect("present");
        let mover = [&record.player0_id, &record.player1_id][record.to_move as usize]
            .clone()
            .expect("human");
        last_mover = mover.clone();
        games
            .submit_move(&session, &game.uuid, &mover, count, PlayedMove::Pass)
            .await
            .expect("pass");
    }

    let record = session
        .games()
        .get(&game.uuid)
        .await
        .expect("load")
        .expect("present");
    assert!(record.over);
    // Each player lost their own rack value; fresh racks are never
    // empty, so both scores went negative
    assert!(record.score0 < 0);
    assert!(record.score1 < 0);
    // Elo state was recorded at finalization
    assert!(record.elo0.is_some());
    assert!(record.human_elo0.is_some());

    // The player who did not make the final pass has an unacknowledged
    // game entry
    let other = if last_mover == "a" { "b" } else { "a" };
    let zombies = session.zombies().list_games(other).await.expect("zombies");
    assert_eq!(zombies.len(), 1);
    assert_eq!(zombies[0].uuid, record.id);
    let mover_zombies = session
        .zombies()
        .list_games(&last_mover)
        .await
        .expect("zombies");
    assert!(mover_zombies.is_empty());

    // Acknowledging removes the entry
    games
        .acknowledge_finished(&session, &record.id, other)
        .await
        .expect("acknowledge");
    let zombies = session.zombies().list_games(other).await.expect("zombies");
    assert!(zombies.is_empty());

    // No further moves are accepted
    let result = games
        .submit_move(
            &session,
            &record.id,
            &last_mover,
            record.moves.len(),
            PlayedMove::Pass,
        )
        .await;
    assert!(matches!(result, Err(CoreError::IllegalState(_))));
}

#[tokio::test]
async fn review_replays_the_stored_moves() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), Some("b"), 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");

    for count in 0..2usize {
        let record = session
            .games()
            .get(&game.uuid)
            .await
            .expect("load")
            .expect("present");
        let mover = [&record.player0_id, &record.player1_id][record.to_move as usize]
            .clone()
            .expect("human");
        games
            .submit_move(&session, &game.uuid, &mover, count, PlayedMove::Pass)
            .await
            .expect("pass");
    }

    let loaded = games
        .load_game(&session, &game.uuid)
        .await
        .expect("load")
        .expect("present");
    let state = loaded.state_after_move(1).expect("replay");
    // After one pass the scores are untouched and the board empty
    assert_eq!(state.scores(), [0, 0]);
    assert!(state.board().is_empty());
}

#[tokio::test]
async fn live_game_listing_reports_turn_and_scores() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "a", "Anna").await;
    create_user(&session, "b", "Bjorn").await;

    let games = game_service();
    let game = games
        .new_game(&session, Some("a"), Some("b"), 0, PrefsMap::new(), "is_IS")
        .await
        .expect("new game");
    let mover = game.player_id_to_move().expect("human game").to_string();

    let live = session
        .games()
        .list_live_games(&mover, 10)
        .await
        .expect("live games");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].uuid, game.uuid);
    assert!(live[0].my_turn);

    let other = if mover == "a" { "b" } else { "a" };
    let live = session
        .games()
        .list_live_games(other, 10)
        .await
        .expect("live games");
    assert!(!live[0].my_turn);
}
