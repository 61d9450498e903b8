//! Domain services built on the persistence protocol, plus the traits
//! for the external collaborators they consume (robot move generation,
//! word validation, push notification).

use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

pub mod challenges;
pub mod chat;
pub mod elo;
pub mod game;
pub mod stats;
pub mod users;

pub use challenges::ChallengeService;
pub use chat::ChatService;
pub use game::GameService;
pub use stats::StatsService;
pub use users::UserService;

use crate::locales::Locale;
use game::moves::PlayedMove;
use game::state::GameState;

/// Kind of event delivered through the notifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyEvent {
    Move,
    Challenge,
    Chat,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyEvent::Move => "move",
            NotifyEvent::Challenge => "challenge",
            NotifyEvent::Chat => "chat",
        }
    }
}

/// Push-notification delivery. Fire and forget: failures are logged,
/// never propagated.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, event: NotifyEvent) -> Result<(), String>;
}

/// Send a notification, swallowing and logging any failure
pub(crate) async fn notify_user(notifier: &Arc<dyn Notifier>, user_id: &str, event: NotifyEvent) {
    if let Err(err) = notifier.notify(user_id, event).await {
        warn!(
            "Failed to deliver {} notification to {user_id}: {err}",
            event.as_str()
        );
    }
}

/// Robot move generation, consumed as a pure library: given the current
/// state and a difficulty level (0 = strongest), produce a move. CPU
/// bound and synchronous; completes well under a second per move.
pub trait MoveGenerator: Send + Sync {
    fn generate_move(&self, state: &GameState, locale: &Locale, level: i32) -> PlayedMove;
}

/// Word validity, consumed as a pure library. The game service performs
/// only minimal local validation; full wordlist checks go through here.
pub trait WordValidator: Send + Sync {
    fn is_valid_word(&self, word: &str, locale: &Locale, vocabulary: &str) -> bool;

    /// Validate every word formed by a placement
    fn is_valid_placement(&self, words: &[String], locale: &Locale, vocabulary: &str) -> bool;
}

/// A notifier that drops every event; useful where delivery is not
/// configured
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _user_id: &str, _event: NotifyEvent) -> Result<(), String> {
        Ok(())
    }
}

/// A validator that accepts every word; used when validation is
/// delegated entirely to manual word check
pub struct AcceptAllValidator;

impl WordValidator for AcceptAllValidator {
    fn is_valid_word(&self, _word: &str, _locale: &Locale, _vocabulary: &str) -> bool {
        true
    }

    fn is_valid_placement(&self, _words: &[String], _locale: &Locale, _vocabulary: &str) -> bool {
        true
    }
}
