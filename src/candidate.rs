//! Per-discard analysis results.

use std::cmp::Ordering;

use crate::tile::DISCARD_PRIORITIES;

/// A tile that would improve the hand, with its live count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredTile {
    pub tile: u8,
    pub count: u8,
}

/// Analysis of one discard choice (or of the hand as drawn, `tile == None`).
/// The three curves are indexed by the current turn; entries are cumulative
/// over the remaining draws.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub tile: Option<u8>,
    pub required_tiles: Vec<RequiredTile>,
    pub num_required_tiles: u8,
    pub tenpai_probs: Vec<f64>,
    pub win_probs: Vec<f64>,
    pub exp_values: Vec<f64>,
    pub shanten_down: bool,
}

/// Ranking key for sorting candidate lists; each key falls through to the
/// next on ties, ending at the static discard priority.
#[derive(Debug, Clone, Copy)]
pub enum RankBy {
    ExpValue,
    WinProb,
    TenpaiProb,
    NotShantenDown,
    NumRequiredTiles,
    DiscardPriority,
}

impl Candidate {
    pub(crate) fn new(
        tile: Option<u8>,
        required_tiles: Vec<RequiredTile>,
        tenpai_probs: Vec<f64>,
        win_probs: Vec<f64>,
        exp_values: Vec<f64>,
        shanten_down: bool,
    ) -> Self {
        let num_required_tiles = required_tiles.iter().map(|r| r.count).sum();
        Self {
            tile,
            required_tiles,
            num_required_tiles,
            tenpai_probs: tenpai_probs.into_iter().map(|p| p.clamp(0., 1.)).collect(),
            win_probs: win_probs.into_iter().map(|p| p.clamp(0., 1.)).collect(),
            exp_values: exp_values.into_iter().map(|v| v.max(0.)).collect(),
            shanten_down,
        }
    }

    pub fn cmp_by(&self, other: &Self, by: RankBy) -> Ordering {
        if self.tile == other.tile {
            return Ordering::Equal;
        }
        let first = |v: &[f64]| v.first().copied().unwrap_or(0.);
        match by {
            RankBy::ExpValue => first(&self.exp_values)
                .total_cmp(&first(&other.exp_values))
                .then_with(|| self.cmp_by(other, RankBy::WinProb)),
            RankBy::WinProb => first(&self.win_probs)
                .total_cmp(&first(&other.win_probs))
                .then_with(|| self.cmp_by(other, RankBy::TenpaiProb)),
            RankBy::TenpaiProb => first(&self.tenpai_probs)
                .total_cmp(&first(&other.tenpai_probs))
                .then_with(|| self.cmp_by(other, RankBy::NotShantenDown)),
            RankBy::NotShantenDown => match (self.shanten_down, other.shanten_down) {
                (false, true) => Ordering::Greater,
                (true, false) => Ordering::Less,
                _ => self.cmp_by(other, RankBy::NumRequiredTiles),
            },
            RankBy::NumRequiredTiles => self
                .num_required_tiles
                .cmp(&other.num_required_tiles)
                .then_with(|| self.cmp_by(other, RankBy::DiscardPriority)),
            RankBy::DiscardPriority => {
                let p = |t: Option<u8>| t.map_or(0, |t| DISCARD_PRIORITIES[t as usize]);
                p(self.tile).cmp(&p(other.tile))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(tile: u8, ev: f64, win: f64) -> Candidate {
        Candidate::new(
            Some(tile),
            vec![RequiredTile { tile: 0, count: 4 }],
            vec![0.5; 17],
            vec![win; 17],
            vec![ev; 17],
            false,
        )
    }

    #[test]
    fn ranks_by_ev_then_win() {
        let a = candidate(1, 1000., 0.1);
        let b = candidate(2, 900., 0.5);
        assert_eq!(a.cmp_by(&b, RankBy::ExpValue), Ordering::Greater);
        let c = candidate(3, 1000., 0.2);
        assert_eq!(c.cmp_by(&a, RankBy::ExpValue), Ordering::Greater);
    }

    #[test]
    fn clamps_curves() {
        let c = Candidate::new(None, vec![], vec![1.2], vec![-0.1], vec![-5.0], false);
        assert_eq!(c.tenpai_probs[0], 1.0);
        assert_eq!(c.win_probs[0], 0.0);
        assert_eq!(c.exp_values[0], 0.0);
    }
}
