//! Distance-to-ready (shanten) calculation.
//!
//! Normal-form shanten is computed per tile group (three suits plus honors)
//! as a minimum-deficit table: for each "s mentsu, with or without the pair"
//! target, the fewest tiles that must be added to this group to meet it.
//! The four group tables are folded with a min-plus merge. The hand's
//! shanten is the deficit of the full "N mentsu + pair" target minus one.
//! Per-rank demand is capped at four copies, so waits on tiles the hand has
//! exhausted are never counted.

use std::cell::RefCell;

use ahash::AHashMap;

use crate::hand::Hand;
use crate::tile::TILE_KINDS;

/// Which ready-shape family to measure against. Passed through opaquely by
/// the analysis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShantenKind {
    Normal,
    Chiitoitsu,
    Kokushi,
    /// Minimum of the three families (chiitoitsu and kokushi only apply to
    /// hands that need four mentsu).
    #[default]
    Union,
}

const INF: u8 = 99;

/// Deficit table for one tile group: index `s` (0..=4) is "s mentsu, no
/// pair", index `5 + s` is "s mentsu plus the pair".
type GroupTable = [u8; 10];

struct GroupSolver<'a> {
    counts: &'a [u8],
    ranks: usize,
    allow_runs: bool,
    // (rank, runs started one back, runs started two back, mentsu left, pair left)
    memo: [[[[[u8; 2]; 5]; 5]; 5]; 10],
}

impl<'a> GroupSolver<'a> {
    fn new(counts: &'a [u8], allow_runs: bool) -> Self {
        Self {
            counts,
            ranks: counts.len(),
            allow_runs,
            memo: [[[[[u8::MAX; 2]; 5]; 5]; 5]; 10],
        }
    }

    fn table(counts: &'a [u8], allow_runs: bool) -> GroupTable {
        let mut solver = Self::new(counts, allow_runs);
        let mut table = [INF; 10];
        for sets in 0..=4 {
            for pair in 0..=1 {
                table[sets + 5 * pair] = solver.solve(0, 0, 0, sets as u8, pair as u8);
            }
        }
        table
    }

    /// Minimum tiles to add to ranks `r..` so that exactly `sets_left` mentsu
    /// and `pair_left` pairs are placed there, given runs begun at `r - 1`
    /// (`one_back`) and `r - 2` (`two_back`) that still claim a tile here.
    fn solve(&mut self, r: usize, one_back: u8, two_back: u8, sets_left: u8, pair_left: u8) -> u8 {
        if r == self.ranks {
            return if one_back == 0 && two_back == 0 && sets_left == 0 && pair_left == 0 {
                0
            } else {
                INF
            };
        }
        if self.memo[r][one_back as usize][two_back as usize][sets_left as usize][pair_left as usize]
            != u8::MAX
        {
            return self.memo[r][one_back as usize][two_back as usize][sets_left as usize]
                [pair_left as usize];
        }

        let mut best = INF;
        let max_new_runs = if self.allow_runs && r + 2 < self.ranks {
            sets_left.min(4)
        } else {
            0
        };
        for new_runs in 0..=max_new_runs {
            for triplet in 0..=(sets_left - new_runs).min(1) {
                for pair in 0..=pair_left {
                    let demand = two_back + one_back + new_runs + 3 * triplet + 2 * pair;
                    if demand > 4 {
                        continue;
                    }
                    let short = demand.saturating_sub(self.counts[r]);
                    let rest = self.solve(
                        r + 1,
                        new_runs,
                        one_back,
                        sets_left - new_runs - triplet,
                        pair_left - pair,
                    );
                    best = best.min(short.saturating_add(rest));
                }
            }
        }
        self.memo[r][one_back as usize][two_back as usize][sets_left as usize][pair_left as usize] =
            best;
        best
    }
}

thread_local! {
    /// Group configurations repeat massively across a search (every
    /// enumerated draw/discard re-derives shanten), so solved tables are
    /// kept per thread, keyed by the base-5 encoding of the group counts.
    static GROUP_CACHE: RefCell<AHashMap<u32, GroupTable>> = RefCell::new(AHashMap::new());
}

fn group_table(counts: &[u8], allow_runs: bool) -> GroupTable {
    let mut key: u32 = allow_runs as u32;
    for &c in counts {
        key = key * 5 + c as u32;
    }
    GROUP_CACHE.with(|cache| {
        if let Some(hit) = cache.borrow().get(&key) {
            return *hit;
        }
        let table = GroupSolver::table(counts, allow_runs);
        cache.borrow_mut().insert(key, table);
        table
    })
}

fn merge(lhs: &GroupTable, rhs: &GroupTable) -> GroupTable {
    let mut out = [INF; 10];
    for (j, o) in out.iter_mut().enumerate() {
        let (sets, pair) = (j % 5, j / 5);
        for a in 0..=sets {
            for p in 0..=pair {
                let v = lhs[a + 5 * p].saturating_add(rhs[(sets - a) + 5 * (pair - p)]);
                *o = (*o).min(v);
            }
        }
    }
    out
}

/// Normal-form shanten: `len_div3` is the number of mentsu the concealed
/// tiles must still form (4 minus melds).
pub fn calc_normal(counts: &[u8; TILE_KINDS], len_div3: u8) -> i8 {
    let m = group_table(&counts[0..9], true);
    let p = group_table(&counts[9..18], true);
    let s = group_table(&counts[18..27], true);
    let z = group_table(&counts[27..34], false);
    let folded = merge(&merge(&merge(&m, &p), &s), &z);
    folded[5 + len_div3.min(4) as usize] as i8 - 1
}

/// Seven-pairs shanten.
pub fn calc_chiitoitsu(counts: &[u8; TILE_KINDS]) -> i8 {
    let mut pairs = 0u8;
    let mut kinds = 0u8;
    for &c in counts.iter() {
        if c > 0 {
            kinds += 1;
            if c >= 2 {
                pairs += 1;
            }
        }
    }
    7 - pairs as i8 + 7u8.saturating_sub(kinds) as i8 - 1
}

/// Thirteen-orphans shanten.
pub fn calc_kokushi(counts: &[u8; TILE_KINDS]) -> i8 {
    const TERMINALS: [usize; 13] = [0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33];
    let mut kinds = 0i8;
    let mut has_pair = false;
    for &idx in &TERMINALS {
        if counts[idx] > 0 {
            kinds += 1;
            if counts[idx] >= 2 {
                has_pair = true;
            }
        }
    }
    14 - kinds - has_pair as i8 - 1
}

/// Shanten of a count histogram for the requested family.
pub fn calc_shanten_from_counts(counts: &[u8; TILE_KINDS], len_div3: u8, kind: ShantenKind) -> i8 {
    match kind {
        ShantenKind::Normal => calc_normal(counts, len_div3),
        ShantenKind::Chiitoitsu => calc_chiitoitsu(counts),
        ShantenKind::Kokushi => calc_kokushi(counts),
        ShantenKind::Union => {
            let mut shanten = calc_normal(counts, len_div3);
            if shanten <= 0 || len_div3 < 4 {
                return shanten;
            }
            shanten = shanten.min(calc_chiitoitsu(counts));
            if shanten > 0 {
                shanten.min(calc_kokushi(counts))
            } else {
                shanten
            }
        }
    }
}

/// Shanten of a [`Hand`]; melds count toward the formed mentsu.
pub fn calc_shanten(hand: &Hand, kind: ShantenKind) -> i8 {
    calc_shanten_from_counts(&hand.counts, hand.len_div3(), kind)
}
