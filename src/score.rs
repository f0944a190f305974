//! Point arithmetic and the score calculator the search engine consumes.

use std::ops::BitOr;

use crate::hand::Hand;
use crate::tile::{self, EAST};
use crate::yaku::{self, YakuContext};

pub use crate::yaku::Yaku;

/// Win-condition flags handed to [`ScoreCalculator::calc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WinFlags {
    bits: u8,
}

impl WinFlags {
    pub const TSUMO: WinFlags = WinFlags { bits: 1 };
    pub const RIICHI: WinFlags = WinFlags { bits: 2 };

    pub fn contains(self, other: WinFlags) -> bool {
        self.bits & other.bits == other.bits
    }
}

impl BitOr for WinFlags {
    type Output = WinFlags;
    fn bitor(self, rhs: WinFlags) -> WinFlags {
        WinFlags {
            bits: self.bits | rhs.bits,
        }
    }
}

/// Payment breakdown for one win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// Winner's total income.
    pub total: u32,
    pub pay_ron: u32,
    pub pay_tsumo_oya: u32,
    pub pay_tsumo_ko: u32,
}

/// Outcome of scoring one completed hand.
#[derive(Debug, Clone)]
pub struct WinResult {
    pub han: u8,
    pub fu: u8,
    pub yakuman: u8,
    pub yaku: Vec<Yaku>,
    pub score: Score,
}

/// Base points from han and fu, before dealer multipliers.
fn base_points(han: u8, fu: u8) -> u32 {
    match han {
        0..=4 => {
            let bp = fu as u32 * 2u32.pow(2 + han as u32);
            bp.min(2000)
        }
        5 => 2000,
        6 | 7 => 3000,
        8..=10 => 4000,
        11 | 12 => 6000,
        _ => 8000 * (han as u32 / 13),
    }
}

fn ceil_100(v: u32) -> u32 {
    v.div_ceil(100) * 100
}

/// Payments for a win worth `base` points.
fn make_score(base: u32, is_oya: bool, is_tsumo: bool) -> Score {
    let (pay_oya, pay_ko) = if is_oya {
        (0, ceil_100(base * 2))
    } else {
        (ceil_100(base * 2), ceil_100(base))
    };
    if is_tsumo {
        let total = if is_oya { pay_ko * 3 } else { pay_oya + pay_ko * 2 };
        Score {
            total,
            pay_ron: 0,
            pay_tsumo_oya: pay_oya,
            pay_tsumo_ko: pay_ko,
        }
    } else {
        let total = ceil_100(base * if is_oya { 6 } else { 4 });
        Score {
            total,
            pay_ron: total,
            pay_tsumo_oya: 0,
            pay_tsumo_ko: 0,
        }
    }
}

/// Score a (han, fu) result; `yakuman` overrides the tier table.
pub fn calculate_points(han: u8, fu: u8, yakuman: u8, is_oya: bool, is_tsumo: bool) -> Score {
    let base = if yakuman > 0 {
        8000 * yakuman as u32
    } else {
        base_points(han, fu)
    };
    make_score(base, is_oya, is_tsumo)
}

/// The external score calculator of the analysis engine: yaku detection,
/// fu counting, and payment totals for one seat.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    /// Round wind tile (27..=30).
    pub bakaze: u8,
    /// Seat wind tile (27..=30).
    pub jikaze: u8,
    /// Actual dora kinds (indicator successors), one entry per indicator.
    pub dora_tiles: Vec<u8>,
}

impl ScoreCalculator {
    pub fn new(bakaze: u8, jikaze: u8) -> Self {
        Self {
            bakaze,
            jikaze,
            dora_tiles: Vec::new(),
        }
    }

    pub fn with_dora(mut self, dora_tiles: Vec<u8>) -> Self {
        self.dora_tiles = dora_tiles;
        self
    }

    pub fn is_oya(&self) -> bool {
        self.jikaze == EAST
    }

    /// Evaluate a completed hand (`win_tile` already added to it). `None`
    /// means the hand has no yaku and cannot win.
    pub fn calc(&self, hand: &Hand, win_tile: u8, flags: WinFlags) -> Option<WinResult> {
        let num_dora: u8 = self
            .dora_tiles
            .iter()
            .map(|&d| {
                hand.counts[tile::normalize(d) as usize]
                    + hand
                        .melds
                        .iter()
                        .flat_map(|m| m.tiles.iter())
                        .filter(|&&t| tile::normalize(t) == tile::normalize(d))
                        .count() as u8
            })
            .sum();
        let num_aka = hand.akas.iter().filter(|&&a| a).count() as u8
            + hand
                .melds
                .iter()
                .flat_map(|m| m.tiles.iter())
                .filter(|&&t| tile::is_red(t))
                .count() as u8;

        let ctx = YakuContext {
            is_menzen: hand.is_menzen(),
            is_riichi: flags.contains(WinFlags::RIICHI) && hand.is_menzen(),
            is_tsumo: flags.contains(WinFlags::TSUMO),
            bakaze: self.bakaze,
            jikaze: self.jikaze,
            num_dora,
            num_aka,
        };
        let res = yaku::calculate_yaku(hand, &ctx, win_tile);
        if !res.has_yaku() {
            return None;
        }

        let score = calculate_points(res.han, res.fu, res.yakuman, self.is_oya(), ctx.is_tsumo);
        Some(WinResult {
            han: res.han,
            fu: res.fu,
            yakuman: res.yakuman,
            yaku: res.yaku,
            score,
        })
    }

    /// Monotonic total-income array indexed by extra han on top of the
    /// result, saturating at the yakuman tier. The search engine picks the
    /// entry matching whichever turn-dependent bonuses fire at a leaf.
    pub fn scores_for_exp(&self, result: &WinResult) -> Vec<i32> {
        const EXTRA: usize = 16;
        if result.yakuman > 0 {
            return vec![result.score.total as i32; EXTRA];
        }
        (0..EXTRA as u8)
            .map(|extra| {
                let s = calculate_points(result.han + extra, result.fu, 0, self.is_oya(), true);
                s.total as i32
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::SOUTH;

    #[test]
    fn non_dealer_tsumo_payments() {
        // 3 han 30 fu: 1000/2000.
        let s = calculate_points(3, 30, 0, false, true);
        assert_eq!(s.pay_tsumo_ko, 1000);
        assert_eq!(s.pay_tsumo_oya, 2000);
        assert_eq!(s.total, 4000);
        // 4 han 20 fu (pinfu tsumo): 1300/2600.
        let s = calculate_points(4, 20, 0, false, true);
        assert_eq!(s.total, 5200);
    }

    #[test]
    fn dealer_tiers() {
        let s = calculate_points(5, 30, 0, true, true);
        assert_eq!(s.total, 12000); // mangan
        let s = calculate_points(8, 30, 0, true, true);
        assert_eq!(s.total, 24000); // baiman
        let s = calculate_points(0, 0, 1, true, true);
        assert_eq!(s.total, 48000); // yakuman
    }

    #[test]
    fn capped_base_points() {
        // 4 han 40 fu exceeds 2000 base points and is paid as mangan.
        let s = calculate_points(4, 40, 0, false, false);
        assert_eq!(s.total, 8000);
    }

    #[test]
    fn exp_scores_are_monotonic() {
        let calc = ScoreCalculator::new(EAST, SOUTH);
        let hand: Hand = "234567m234p56788s".parse().unwrap();
        let result = calc
            .calc(&hand, 24, WinFlags::TSUMO | WinFlags::RIICHI)
            .unwrap();
        let scores = calc.scores_for_exp(&result);
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(scores.len(), 16);
    }

    #[test]
    fn no_yaku_hand_scores_none() {
        let calc = ScoreCalculator::new(EAST, SOUTH);
        let hand: Hand = "456p99p123999s(234m)".parse().unwrap();
        assert!(calc.calc(&hand, 20, WinFlags::TSUMO).is_none());
    }
}
