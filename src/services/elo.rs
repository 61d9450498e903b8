//! Elo rating computation and the real-time, per-game update pipeline.
//!
//! The per-game update is provisional: it gives players immediate
//! feedback after finalization. The authoritative calculation happens
//! once per day in the stats pipeline, which recomputes ratings over
//! the full game history and overwrites the denormalized values.

use crate::db::{
    records::{EloRecord, GameRecord, UserRecord, UserUpdate},
    Backend,
};
use crate::error::CoreResult;
use chrono::Utc;
use log::warn;

/// Rating given to players who have no rating yet
pub const DEFAULT_ELO: i32 = 1200;

/// Lifetime human games beyond which a player is established
pub const ESTABLISHED_MARK: i32 = 10;

/// The K constant used in the Elo calculation, for established players
const ELO_K: f64 = 20.0;

/// The K constant for beginning players
const BEGINNER_K: f64 = 32.0;

/// Computes the Elo adjustments of the two players after their game.
///
/// A player with 1200 points has quotient 10^3, one with 800 points
/// 10^2 and one with 1600 points 10^4, which gives the 1600-point
/// player a 99% expected probability of winning against the 800-point
/// one and 91% against the 1200-point one.
pub fn compute_elo(
    o_elo: (i32, i32),
    sc0: i32,
    sc1: i32,
    est0: bool,
    est1: bool,
) -> (i32, i32) {
    // If no points were scored, this is a null game having no effect
    if sc0 + sc1 == 0 {
        return (0, 0);
    }

    let (elo0, elo1) = o_elo;

    let q0 = 10.0_f64.powf(f64::from(elo0) / 400.0);
    let q1 = 10.0_f64.powf(f64::from(elo1) / 400.0);
    if q0 + q1 < 1.0 {
        // Strange corner case: give up
        return (0, 0);
    }

    // Expected winning probability of each player
    let exp0 = q0 / (q0 + q1);
    let exp1 = q1 / (q0 + q1);

    // The actual outcome
    let (act0, act1) = match sc0.cmp(&sc1) {
        std::cmp::Ordering::Greater => (1.0, 0.0),
        std::cmp::Ordering::Less => (0.0, 1.0),
        std::cmp::Ordering::Equal => (0.5, 0.5),
    };

    let k0 = if est0 { ELO_K } else { BEGINNER_K };
    let k1 = if est1 { ELO_K } else { BEGINNER_K };

    let mut adj0 = ((act0 - exp0) * k0).round() as i32;
    let mut adj1 = ((act1 - exp1) * k1).round() as i32;

    // Never adjust a rating below zero
    if adj0 + elo0 < 0 {
        adj0 = -elo0;
    }
    if adj1 + elo1 < 0 {
        adj1 = -elo1;
    }

    (adj0, adj1)
}

/// The Elo state a finalized game records: both players' pre-game
/// ratings and the adjustments applied, for all three parallel ratings
#[derive(Debug, Clone, Default)]
pub struct GameEloUpdate {
    pub elo0: Option<i32>,
    pub elo1: Option<i32>,
    pub elo0_adj: Option<i32>,
    pub elo1_adj: Option<i32>,
    pub human_elo0: Option<i32>,
    pub human_elo1: Option<i32>,
    pub human_elo0_adj: Option<i32>,
    pub human_elo1_adj: Option<i32>,
    pub manual_elo0: Option<i32>,
    pub manual_elo1: Option<i32>,
    pub manual_elo0_adj: Option<i32>,
    pub manual_elo1_adj: Option<i32>,
}

/// Substitute the default rating for a missing or zero legacy value
fn seed(value: i32) -> i32 {
    if value > 0 {
        value
    } else {
        DEFAULT_ELO
    }
}

/// Current rating triple of one seat
struct SeatRating {
    elo: i32,
    human_elo: i32,
    manual_elo: i32,
}

/// Load the rating state of one seat: the locale rating row if one
/// exists, else the legacy per-user fields when the user's primary
/// locale matches, else the default rating
async fn seat_rating(
    db: &dyn Backend,
    locale: &str,
    robot_level: i32,
    user: Option<&UserRecord>,
) -> CoreResult<SeatRating> {
    match user {
        None => {
            // Robot seat: robots never have human or manual ratings
            let elo = db
                .robots()
                .get_elo(locale, robot_level)
                .await?
                .unwrap_or(DEFAULT_ELO);
            Ok(SeatRating {
                elo,
                human_elo: DEFAULT_ELO,
                manual_elo: DEFAULT_ELO,
            })
        }
        Some(user) => match db.elo().get(locale, &user.id).await? {
            Some(rating) => Ok(SeatRating {
                elo: rating.elo,
                human_elo: rating.human_elo,
                manual_elo: rating.manual_elo,
            }),
            None if user.locale == locale => Ok(SeatRating {
                elo: seed(user.elo),
                human_elo: seed(user.human_elo),
                manual_elo: seed(user.manual_elo),
            }),
            None => Ok(SeatRating {
                elo: DEFAULT_ELO,
                human_elo: DEFAULT_ELO,
                manual_elo: DEFAULT_ELO,
            }),
        },
    }
}

/// Whether a player counts as established, based on lifetime human
/// games across all locales. Robots are always established.
async fn is_established(db: &dyn Backend, user: Option<&UserRecord>) -> CoreResult<bool> {
    match user {
        None => Ok(true),
        Some(user) => {
            let human_games = db
                .stats()
                .newest_for_user(&user.id)
                .await?
                .map(|stats| stats.human_games)
                .unwrap_or(0);
            Ok(human_games > ESTABLISHED_MARK)
        }
    }
}

/// One rating track computed for the game: the pre-game ratings and the
/// adjustments, with the established-vs-beginner rule applied
pub(crate) fn compute_track(
    elo0: i32,
    elo1: i32,
    sc0: i32,
    sc1: i32,
    est0: bool,
    est1: bool,
    no_adjust: bool,
) -> (i32, i32) {
    let mut adj = if no_adjust {
        (0, 0)
    } else {
        compute_elo((elo0, elo1), sc0, sc1, est0, est1)
    };
    // An established player neither gains nor loses against a beginner
    if est0 && !est1 {
        adj.0 = 0;
    }
    if est1 && !est0 {
        adj.1 = 0;
    }
    adj
}

/// Compute new Elo ratings when a game is over, scoped to the locale in
/// which it was played. The updated ratings are written back through
/// the repositories; the returned update is recorded on the game.
///
/// The adjustment is zero, but ratings are still recorded and their
/// timestamps updated, when both final scores are zero or the game
/// opened with an immediate resignation.
pub async fn update_elo_for_game(
    db: &dyn Backend,
    game: &GameRecord,
    u0: Option<&UserRecord>,
    u1: Option<&UserRecord>,
) -> CoreResult<GameEloUpdate> {
    let mut update = GameEloUpdate::default();

    if !game.over {
        warn!("Elo update requested for game {} that is not over", game.id);
        return Ok(update);
    }
    if u0.is_none() && u1.is_none() {
        warn!("Elo update requested for game {} with no users", game.id);
        return Ok(update);
    }

    let sc0 = game.score0;
    let sc1 = game.score1;

    // Games that never properly started don't count in the ratings
    let no_adjust = (sc0 == 0 && sc1 == 0)
        || game.moves.first().map(|m| m.is_resignation()).unwrap_or(false)
        || game.moves.get(1).map(|m| m.is_resignation()).unwrap_or(false);

    let locale = &game.locale;
    let robot_game = game.is_robot_game();
    let robot_level = if robot_game { game.robot_level } else { 0 };
    let manual_game = !robot_game && game.manual_wordcheck();

    let est0 = is_established(db, u0).await?;
    let est1 = is_established(db, u1).await?;

    let rating0 = seat_rating(db, locale, robot_level, u0).await?;
    let rating1 = seat_rating(db, locale, robot_level, u1).await?;

    // The all-games rating track
    let (elo0, elo1) = (rating0.elo, rating1.elo);
    let adj = compute_track(elo0, elo1, sc0, sc1, est0, est1, no_adjust);
    update.elo0 = Some(elo0);
    update.elo1 = Some(elo1);
    update.elo0_adj = Some(adj.0);
    update.elo1_adj = Some(adj.1);
    let new_elo0 = elo0 + adj.0;
    let new_elo1 = elo1 + adj.1;

    let mut new_human0 = rating0.human_elo;
    let mut new_human1 = rating1.human_elo;
    let mut new_manual0 = rating0.manual_elo;
    let mut new_manual1 = rating1.manual_elo;

    if !robot_game {
        // The human-only rating track
        let (h0, h1) = (rating0.human_elo, rating1.human_elo);
        let adj = compute_track(h0, h1, sc0, sc1, est0, est1, no_adjust);
        update.human_elo0 = Some(h0);
        update.human_elo1 = Some(h1);
        update.human_elo0_adj = Some(adj.0);
        update.human_elo1_adj = Some(adj.1);
        new_human0 = h0 + adj.0;
        new_human1 = h1 + adj.1;

        if manual_game {
            // The manual-wordcheck rating track
            let (m0, m1) = (rating0.manual_elo, rating1.manual_elo);
            let adj = compute_track(m0, m1, sc0, sc1, est0, est1, no_adjust);
            update.manual_elo0 = Some(m0);
            update.manual_elo1 = Some(m1);
            update.manual_elo0_adj = Some(adj.0);
            update.manual_elo1_adj = Some(adj.1);
            new_manual0 = m0 + adj.0;
            new_manual1 = m1 + adj.1;
        }
    }

    // Write the updated ratings back
    store_seat(db, locale, robot_level, u0, new_elo0, new_human0, new_manual0).await?;
    store_seat(db, locale, robot_level, u1, new_elo1, new_human1, new_manual1).await?;

    Ok(update)
}

/// Upsert the rating row of one seat and refresh the denormalized view
/// on the user when the game locale is the user's own locale
async fn store_seat(
    db: &dyn Backend,
    locale: &str,
    robot_level: i32,
    user: Option<&UserRecord>,
    elo: i32,
    human_elo: i32,
    manual_elo: i32,
) -> CoreResult<()> {
    match user {
        None => {
            db.robots().upsert_elo(locale, robot_level, elo).await?;
        }
        Some(user) => {
            db.elo()
                .upsert(&EloRecord {
                    user_id: user.id.clone(),
                    locale: locale.to_string(),
                    elo,
                    human_elo,
                    manual_elo,
                    timestamp: Utc::now(),
                })
                .await?;
            if user.locale == locale {
                db.users()
                    .update(
                        &user.id,
                        UserUpdate {
                            elo: Some(elo),
                            human_elo: Some(human_elo),
                            manual_elo: Some(manual_elo),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equal_ratings_established_win() {
        // K = 20, E = 0.5: winner +10, loser -10
        let (adj0, adj1) = compute_elo((1200, 1200), 300, 250, true, true);
        assert_eq!(adj0, 10);
        assert_eq!(adj1, -10);
    }

    #[test]
    fn equal_ratings_beginner_win() {
        // K = 32, E = 0.5: winner +16, loser -16
        let (adj0, adj1) = compute_elo((1200, 1200), 300, 250, false, false);
        assert_eq!(adj0, 16);
        assert_eq!(adj1, -16);
    }

    #[test]
    fn draw_changes_nothing_between_equals() {
        let (adj0, adj1) = compute_elo((1200, 1200), 250, 250, true, true);
        assert_eq!((adj0, adj1), (0, 0));
    }

    #[test]
    fn null_game_has_no_effect() {
        let (adj0, adj1) = compute_elo((1400, 1100), 0, 0, true, true);
        assert_eq!((adj0, adj1), (0, 0));
    }

    #[test]
    fn underdog_gains_more() {
        let (adj0, adj1) = compute_elo((1600, 800), 200, 300, true, true);
        // The 800-point player beat a 1600-point player
        assert!(adj1 > 15, "underdog win should gain close to K");
        assert!(adj0 < -15);
    }

    #[test]
    fn rating_never_goes_negative() {
        let (adj0, _) = compute_elo((3, 1200), 100, 300, false, false);
        assert!(adj0 >= -3);
    }

    #[test]
    fn established_vs_beginner_zeroing() {
        let adj = compute_track(1200, 1200, 300, 250, true, false, false);
        // The established winner gains nothing; the beginner still loses
        assert_eq!(adj.0, 0);
        assert_eq!(adj.1, -16);
    }
}
