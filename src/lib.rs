//! Riichi hand analysis centered on an expected-value search engine.
//!
//! Given a 13- or 14-tile hand, [`ExpectedValueCalculator`] enumerates every
//! legal discard (or the pure draw for a 13-tile hand) and attaches per-turn
//! tenpai probability, win probability, and expected score curves to each.

pub mod agari;
pub mod calc;
pub mod candidate;
pub mod error;
pub mod hand;
pub mod score;
pub mod shanten;
pub mod tile;
pub mod yaku;

pub use calc::{count_left_tiles, CalcFlags, ExpectedValueCalculator};
pub use candidate::{Candidate, RequiredTile};
pub use error::CalcError;
pub use hand::{Hand, Meld, MeldType};
pub use score::{ScoreCalculator, WinFlags, WinResult};
pub use shanten::ShantenKind;
