use thiserror::Error;

/// Everything that can go wrong while validating input or running an
/// analysis. Leaf hands without yaku are not errors; they score zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    /// The hand plus melds does not add up to 13 or 14 tiles.
    #[error("hand must hold 13 or 14 tiles including melds, got {0}")]
    InvalidHandSize(usize),

    /// The hand is already complete; there is nothing to analyze.
    #[error("hand is already a winning hand")]
    AlreadyWinning,

    /// More copies of a tile are visible than exist in the set.
    #[error("more than four copies of tile {0} are visible")]
    InvalidTileCount(u8),

    /// A hand or tile string could not be parsed.
    #[error("failed to parse '{input}': {reason}")]
    ParseHand { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CalcError>;
