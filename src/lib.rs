#![warn(unused_crate_dependencies)]

//! Persistence and domain core for a two-player word-placement game
//! service: the repository protocol with its two storage backends, the
//! per-request session contract, the game lifecycle, Elo ratings,
//! matchmaking and chat.

pub mod config;
pub mod db;
pub mod error;
pub mod locales;
pub mod services;
pub mod utils;

pub use error::{CoreError, CoreResult};
