//! Expected-value search over the remaining draws of a round.
//!
//! For every legal discard (or for the hand as drawn) the engine produces
//! three per-turn curves: probability of reaching tenpai, probability of
//! winning, and expected score, all cumulative over the remaining draws.
//! `draw` and `discard` recurse into each other down to the winning state;
//! per-stage draw probabilities compose hypergeometric-style marginals from
//! tables precomputed against the wall size at the start of the call.

use std::env;
use std::fs;
use std::ops::BitOr;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::OnceLock;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::candidate::{Candidate, RankBy, RequiredTile};
use crate::error::CalcError;
use crate::hand::{Hand, Meld};
use crate::score::{ScoreCalculator, WinFlags};
use crate::shanten::{self, ShantenKind};
use crate::tile::{self, COUNT_SLOTS, DISCARD_PRIORITIES, TILE_KINDS};

/// Deepest shanten for which full probability curves are computed; hands
/// further out get useful-tile data only.
const SHANTEN_THRESHOLD: i8 = 3;

/// Wall size assumed by the exact single-indicator uradora blend.
const URADORA_WALL: f64 = 121.0;

/// Columns per row of the static uradora table (0..=12 hidden dora).
const URADORA_COLS: usize = 13;

/// Engine options. Unknown bits are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalcFlags {
    bits: u32,
}

impl CalcFlags {
    pub const NONE: CalcFlags = CalcFlags { bits: 0 };
    /// Permit one shape-regressing discard per search path.
    pub const SHANTEN_DOWN: CalcFlags = CalcFlags { bits: 1 };
    /// Also enumerate draws that swap a useful tile for another.
    pub const TEGAWARI: CalcFlags = CalcFlags { bits: 1 << 1 };
    /// +1 han when tenpai is reached on the very first turn.
    pub const DOUBLE_RIICHI: CalcFlags = CalcFlags { bits: 1 << 2 };
    /// +1 han when the win lands on the turn right after tenpai.
    pub const IPPATSU: CalcFlags = CalcFlags { bits: 1 << 3 };
    /// +1 han when the win lands on the final draw.
    pub const HAITEI: CalcFlags = CalcFlags { bits: 1 << 4 };
    /// Blend hidden-dora expectations into leaf scores.
    pub const URADORA: CalcFlags = CalcFlags { bits: 1 << 5 };
    /// Treat red-five draws as events distinct from their plain fives.
    pub const RED_FIVE_DRAWS: CalcFlags = CalcFlags { bits: 1 << 6 };
    /// Rank discards by win probability instead of expected value.
    pub const MAXIMIZE_WIN_PROB: CalcFlags = CalcFlags { bits: 1 << 7 };
    /// Rotate regression-branch curves forward one turn. An experimental
    /// compensation for suspected under-counting; never applied silently.
    pub const SHANTEN_DOWN_SHIFT: CalcFlags = CalcFlags { bits: 1 << 8 };

    pub fn contains(self, other: CalcFlags) -> bool {
        self.bits & other.bits == other.bits
    }
}

impl BitOr for CalcFlags {
    type Output = CalcFlags;
    fn bitor(self, rhs: CalcFlags) -> CalcFlags {
        CalcFlags {
            bits: self.bits | rhs.bits,
        }
    }
}

/// Remaining copies of every tile after subtracting the hand, melds, and
/// dora indicators. Slots 34..37 track the red fives separately; their
/// copies are also counted in the base slots.
pub fn count_left_tiles(
    hand: &Hand,
    dora_indicators: &[u8],
) -> Result<[u8; COUNT_SLOTS], CalcError> {
    let mut counts = [4u8; COUNT_SLOTS];
    for slot in counts.iter_mut().skip(TILE_KINDS) {
        *slot = 1;
    }

    let mut take = |counts: &mut [u8; COUNT_SLOTS], t: u8, n: u8| -> Result<(), CalcError> {
        let kind = tile::normalize(t);
        counts[kind as usize] = counts[kind as usize]
            .checked_sub(n)
            .ok_or(CalcError::InvalidTileCount(kind))?;
        if tile::is_red(t) {
            counts[t as usize] = counts[t as usize]
                .checked_sub(n)
                .ok_or(CalcError::InvalidTileCount(t))?;
        }
        Ok(())
    };

    for kind in 0..TILE_KINDS as u8 {
        take(&mut counts, kind, hand.counts[kind as usize])?;
    }
    for (i, &aka) in hand.akas.iter().enumerate() {
        if aka {
            // The base slot was already charged with the hand count.
            counts[TILE_KINDS + i] = counts[TILE_KINDS + i]
                .checked_sub(1)
                .ok_or(CalcError::InvalidTileCount(tile::red_tile(i)))?;
        }
    }
    for meld in &hand.melds {
        for &t in &meld.tiles {
            take(&mut counts, t, 1)?;
        }
    }
    for &t in dora_indicators {
        take(&mut counts, t, 1)?;
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Static uradora table
// ---------------------------------------------------------------------------

static URADORA_TABLE: OnceLock<Option<Vec<Vec<f64>>>> = OnceLock::new();

/// Rows are indexed by the number of visible indicators, columns by the
/// number of hidden dora added. Loaded once per process; a missing file
/// downgrades the uradora flag instead of failing.
fn uradora_table() -> Option<&'static Vec<Vec<f64>>> {
    URADORA_TABLE.get_or_init(load_uradora_table).as_ref()
}

fn load_uradora_table() -> Option<Vec<Vec<f64>>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.join("uradora.txt"));
        }
    }
    paths.push(PathBuf::from("data/uradora.txt"));
    paths.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/uradora.txt"));

    for path in &paths {
        if let Ok(text) = fs::read_to_string(path) {
            let table = parse_uradora_table(&text);
            if !table.is_empty() {
                debug!(path = %path.display(), rows = table.len(), "loaded uradora table");
                return Some(table);
            }
        }
    }
    warn!("uradora.txt not found; hidden-dora blending disabled");
    None
}

fn parse_uradora_table(text: &str) -> Vec<Vec<f64>> {
    let rows: Vec<Vec<f64>> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            l.split_whitespace()
                .filter_map(|v| v.parse::<f64>().ok())
                .collect()
        })
        .collect();
    if rows.iter().any(|r| r.len() != URADORA_COLS) {
        return Vec::new();
    }
    rows
}

// ---------------------------------------------------------------------------
// Probability tables
// ---------------------------------------------------------------------------

struct ProbTables {
    /// `tumo[k][j]`: chance that the draw on turn `j` is one of `k` target
    /// tiles, with the wall fixed at its size on turn 0.
    tumo: [Vec<f64>; 5],
    /// `not_tumo[s][j]`: chance that none of `s` target tiles appeared on
    /// turns `0..j`. Monotonically non-increasing in `j`.
    not_tumo: Vec<Vec<f64>>,
}

fn build_prob_tables(n_left_tiles: usize, max_turns: usize) -> ProbTables {
    let mut tumo: [Vec<f64>; 5] = Default::default();
    for (k, row) in tumo.iter_mut().enumerate() {
        *row = (0..max_turns)
            .map(|j| {
                if n_left_tiles > j {
                    k as f64 / (n_left_tiles - j) as f64
                } else {
                    0.0
                }
            })
            .collect();
    }

    // One row per possible target-tile total, including the degenerate case
    // where every remaining tile is a target.
    let mut not_tumo = vec![vec![0.0; max_turns]; n_left_tiles + 1];
    for (s, row) in not_tumo.iter_mut().enumerate() {
        row[0] = 1.0;
        for j in 0..(max_turns - 1).min(n_left_tiles.saturating_sub(s)) {
            row[j + 1] = row[j] * (n_left_tiles - s - j) as f64 / (n_left_tiles - j) as f64;
        }
    }

    ProbTables { tumo, not_tumo }
}

// ---------------------------------------------------------------------------
// Search state
// ---------------------------------------------------------------------------

/// Mutable search position; also the memoization key. Melds never change
/// within a call and stay outside.
#[derive(Clone, PartialEq, Eq, Hash)]
struct SearchState {
    hand_counts: [u8; TILE_KINDS],
    akas_in_hand: [bool; 3],
    counts: [u8; COUNT_SLOTS],
    n_extra_tumo: u8,
}

impl SearchState {
    fn deal(&mut self, t: u8) {
        let kind = tile::normalize(t) as usize;
        self.hand_counts[kind] += 1;
        self.counts[kind] -= 1;
        if tile::is_red(t) {
            self.counts[t as usize] -= 1;
            self.akas_in_hand[tile::red_index(t).unwrap()] = true;
        }
    }

    fn undo_deal(&mut self, t: u8) {
        let kind = tile::normalize(t) as usize;
        self.hand_counts[kind] -= 1;
        self.counts[kind] += 1;
        if tile::is_red(t) {
            self.counts[t as usize] += 1;
            self.akas_in_hand[tile::red_index(t).unwrap()] = false;
        }
    }

    fn discard(&mut self, t: u8) {
        let kind = tile::normalize(t) as usize;
        self.hand_counts[kind] -= 1;
        if tile::is_red(t) {
            self.akas_in_hand[tile::red_index(t).unwrap()] = false;
        }
    }

    fn undo_discard(&mut self, t: u8) {
        let kind = tile::normalize(t) as usize;
        self.hand_counts[kind] += 1;
        if tile::is_red(t) {
            self.akas_in_hand[tile::red_index(t).unwrap()] = true;
        }
    }

    fn sum_left_tiles(&self) -> usize {
        self.counts[..TILE_KINDS].iter().map(|&c| c as usize).sum()
    }
}

#[derive(Clone, Copy)]
struct DrawTile {
    tile: u8,
    count: u8,
    shanten_diff: i8,
}

#[derive(Clone, Copy)]
struct DiscardTile {
    tile: u8,
    shanten_diff: i8,
}

/// Per-turn result curves shared through the caches.
struct Values {
    tenpai: Vec<f64>,
    win: Vec<f64>,
    exp: Vec<f64>,
}

impl Values {
    fn zeros(len: usize) -> Self {
        Values {
            tenpai: vec![0.0; len],
            win: vec![0.0; len],
            exp: vec![0.0; len],
        }
    }
}

enum ScoresOrValues {
    /// Leaf scores for +0..+3 bonus han.
    Scores([f64; 4]),
    Values(Rc<Values>),
}

type StateCache = [AHashMap<SearchState, Rc<Values>>; (SHANTEN_THRESHOLD + 2) as usize];

#[derive(Clone, PartialEq, Eq, Hash)]
struct ScoreKey {
    hand_counts: [u8; TILE_KINDS],
    akas_in_hand: [bool; 3],
    win_tile: u8,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The expected-value engine. One instance carries the option set; every
/// call owns its own caches and tables.
#[derive(Debug, Clone)]
pub struct ExpectedValueCalculator {
    shanten_kind: ShantenKind,
    calc_shanten_down: bool,
    calc_tegawari: bool,
    calc_double_riichi: bool,
    calc_ippatsu: bool,
    calc_haitei: bool,
    calc_uradora: bool,
    calc_red_draws: bool,
    maximize_win_prob: bool,
    shift_shanten_down: bool,
}

impl ExpectedValueCalculator {
    pub fn new(shanten_kind: ShantenKind, flags: CalcFlags) -> Self {
        Self {
            shanten_kind,
            calc_shanten_down: flags.contains(CalcFlags::SHANTEN_DOWN),
            calc_tegawari: flags.contains(CalcFlags::TEGAWARI),
            calc_double_riichi: flags.contains(CalcFlags::DOUBLE_RIICHI),
            calc_ippatsu: flags.contains(CalcFlags::IPPATSU),
            calc_haitei: flags.contains(CalcFlags::HAITEI),
            calc_uradora: flags.contains(CalcFlags::URADORA),
            calc_red_draws: flags.contains(CalcFlags::RED_FIVE_DRAWS),
            maximize_win_prob: flags.contains(CalcFlags::MAXIMIZE_WIN_PROB),
            shift_shanten_down: flags.contains(CalcFlags::SHANTEN_DOWN_SHIFT),
        }
    }

    /// Analyze a hand, deriving the remaining counts from the hand and the
    /// dora indicators.
    pub fn calc(
        &self,
        hand: &Hand,
        score_calculator: &ScoreCalculator,
        dora_indicators: &[u8],
    ) -> Result<Vec<Candidate>, CalcError> {
        let counts = count_left_tiles(hand, dora_indicators)?;
        self.calc_with_counts(hand, score_calculator, dora_indicators, counts)
    }

    /// Analyze a hand against caller-supplied remaining counts.
    pub fn calc_with_counts(
        &self,
        hand: &Hand,
        score_calculator: &ScoreCalculator,
        dora_indicators: &[u8],
        counts: [u8; COUNT_SLOTS],
    ) -> Result<Vec<Candidate>, CalcError> {
        let n_tiles = hand.num_total_tiles();
        if n_tiles != 13 && n_tiles != 14 {
            return Err(CalcError::InvalidHandSize(n_tiles));
        }
        let shanten = shanten::calc_shanten(hand, self.shanten_kind);
        if shanten == -1 {
            return Err(CalcError::AlreadyWinning);
        }

        let max_turns = if n_tiles == 13 { 18 } else { 17 };
        let wall: usize = counts[..TILE_KINDS].iter().map(|&c| c as usize).sum();
        debug!(shanten, wall, max_turns, "analyzing hand");

        let mut search = Search {
            sup: self,
            score_calculator,
            dora_indicators,
            melds: &hand.melds,
            is_menzen: hand.is_menzen(),
            len_div3: hand.len_div3(),
            max_turns,
            tables: build_prob_tables(wall, max_turns),
            state: SearchState {
                hand_counts: hand.counts,
                akas_in_hand: hand.akas,
                counts,
                n_extra_tumo: 0,
            },
            draw_cache: Default::default(),
            discard_cache: Default::default(),
            score_cache: AHashMap::new(),
        };

        let mut candidates = if n_tiles == 14 {
            if shanten <= SHANTEN_THRESHOLD {
                search.analyze_discard(shanten)
            } else {
                search.analyze_discard_simple(shanten)
            }
        } else if shanten <= SHANTEN_THRESHOLD {
            search.analyze_draw(shanten)
        } else {
            search.analyze_draw_simple()
        };

        debug!(
            draw_states = search.draw_cache.iter().map(|c| c.len()).sum::<usize>(),
            discard_states = search.discard_cache.iter().map(|c| c.len()).sum::<usize>(),
            leaf_scores = search.score_cache.len(),
            "search caches flushed"
        );

        let by = if self.maximize_win_prob {
            RankBy::WinProb
        } else {
            RankBy::ExpValue
        };
        candidates.sort_by(|l, r| r.cmp_by(l, by));
        Ok(candidates)
    }
}

struct Search<'a> {
    sup: &'a ExpectedValueCalculator,
    score_calculator: &'a ScoreCalculator,
    dora_indicators: &'a [u8],
    melds: &'a [Meld],
    is_menzen: bool,
    len_div3: u8,
    max_turns: usize,
    tables: ProbTables,
    state: SearchState,
    draw_cache: StateCache,
    discard_cache: StateCache,
    score_cache: AHashMap<ScoreKey, Option<Rc<Vec<i32>>>>,
}

impl Search<'_> {
    // -- move enumeration ---------------------------------------------------

    fn get_draw_tiles(&self, shanten: i8) -> Vec<DrawTile> {
        let mut out = Vec::with_capacity(TILE_KINDS);
        let mut hand = self.state.hand_counts;
        for kind in 0..TILE_KINDS as u8 {
            let count = self.state.counts[kind as usize];
            if count == 0 {
                continue;
            }
            hand[kind as usize] += 1;
            let after = shanten::calc_shanten_from_counts(&hand, self.len_div3, self.sup.shanten_kind);
            hand[kind as usize] -= 1;
            let shanten_diff = after - shanten;

            match tile::red_index(kind) {
                Some(i)
                    if self.sup.calc_red_draws
                        && self.state.counts[tile::red_tile(i) as usize] == 1 =>
                {
                    // The red copy is still live: split it off as its own
                    // event, dropping the plain event when the red copy is
                    // the last five of that suit.
                    if count >= 2 {
                        out.push(DrawTile {
                            tile: kind,
                            count: count - 1,
                            shanten_diff,
                        });
                    }
                    out.push(DrawTile {
                        tile: tile::red_tile(i),
                        count: 1,
                        shanten_diff,
                    });
                }
                _ => out.push(DrawTile {
                    tile: kind,
                    count,
                    shanten_diff,
                }),
            }
        }
        out
    }

    fn get_discard_tiles(&self, shanten: i8) -> Vec<DiscardTile> {
        let mut out = Vec::with_capacity(TILE_KINDS);
        let mut hand = self.state.hand_counts;
        for kind in 0..TILE_KINDS as u8 {
            if hand[kind as usize] == 0 {
                continue;
            }
            hand[kind as usize] -= 1;
            let after = shanten::calc_shanten_from_counts(&hand, self.len_div3, self.sup.shanten_kind);
            hand[kind as usize] += 1;

            // Keep the red five as long as a plain copy can go instead.
            let mut discard = kind;
            if let Some(i) = tile::red_index(kind) {
                if self.state.akas_in_hand[i] && hand[kind as usize] == 1 {
                    discard = tile::red_tile(i);
                }
            }
            out.push(DiscardTile {
                tile: discard,
                shanten_diff: after - shanten,
            });
        }
        out
    }

    /// Tiles that would lower the current shanten, with live counts.
    fn get_required_tiles(&self) -> Vec<RequiredTile> {
        let mut hand = self.state.hand_counts;
        let shanten = shanten::calc_shanten_from_counts(&hand, self.len_div3, self.sup.shanten_kind);
        let mut out = Vec::new();
        for kind in 0..TILE_KINDS as u8 {
            let count = self.state.counts[kind as usize];
            if count == 0 {
                continue;
            }
            hand[kind as usize] += 1;
            let after = shanten::calc_shanten_from_counts(&hand, self.len_div3, self.sup.shanten_kind);
            hand[kind as usize] -= 1;
            if after < shanten {
                out.push(RequiredTile { tile: kind, count });
            }
        }
        out
    }

    // -- leaf scoring -------------------------------------------------------

    /// Scores for +0..+3 bonus han at a winning leaf, uradora blended in.
    /// `None` when the completed hand has no yaku.
    fn get_score(&mut self, win_tile: u8) -> Option<[f64; 4]> {
        let key = ScoreKey {
            hand_counts: self.state.hand_counts,
            akas_in_hand: self.state.akas_in_hand,
            win_tile,
        };
        let up_scores = match self.score_cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let computed = self.eval_win(win_tile);
                self.score_cache.insert(key, computed.clone());
                computed
            }
        }?;
        Some(self.blend_uradora(&up_scores))
    }

    fn eval_win(&self, win_tile: u8) -> Option<Rc<Vec<i32>>> {
        let hand = Hand {
            counts: self.state.hand_counts,
            akas: self.state.akas_in_hand,
            melds: self.melds.to_vec(),
        };
        let mut flags = WinFlags::TSUMO;
        if self.is_menzen {
            flags = flags | WinFlags::RIICHI;
        }
        let result = self.score_calculator.calc(&hand, win_tile, flags)?;
        Some(Rc::new(self.score_calculator.scores_for_exp(&result)))
    }

    /// Fold hidden-dora expectations into the extra-han score vector,
    /// producing the 4 entries addressed by turn-dependent bonuses.
    fn blend_uradora(&self, up_scores: &[i32]) -> [f64; 4] {
        let last = up_scores.len() - 1;
        let pick = |i: usize| up_scores[i.min(last)] as f64;
        let n_dora = self.dora_indicators.len();
        let mut scores = [0.0; 4];

        if self.sup.calc_uradora && self.is_menzen && n_dora == 1 {
            // Exact blend: the hidden indicator promotes each held kind with
            // the probability of its indicator still being unseen. The wall
            // size is fixed at 121 for this blend.
            let mut n_indicators = [0.0f64; 5];
            let mut sum_indicators = 0.0;
            for kind in 0..TILE_KINDS as u8 {
                let held = self.state.hand_counts[kind as usize] as usize;
                if held > 0 {
                    let left = self.state.counts[tile::indicator_of(kind) as usize] as f64;
                    n_indicators[held.min(4)] += left;
                    sum_indicators += left;
                }
            }
            let mut probs = [0.0f64; 5];
            probs[0] = (URADORA_WALL - sum_indicators) / URADORA_WALL;
            for k in 1..5 {
                probs[k] = n_indicators[k] / URADORA_WALL;
            }
            for (base, score) in scores.iter_mut().enumerate() {
                for (k, &p) in probs.iter().enumerate() {
                    *score += pick(base + k) * p;
                }
            }
        } else if self.sup.calc_uradora && self.is_menzen && n_dora > 1 {
            match uradora_table() {
                Some(table) => {
                    let row = &table[n_dora.min(table.len() - 1)];
                    for (base, score) in scores.iter_mut().enumerate() {
                        for (i, &p) in row.iter().enumerate() {
                            *score += pick(base + i) * p;
                        }
                    }
                }
                None => {
                    for (base, score) in scores.iter_mut().enumerate() {
                        *score = pick(base);
                    }
                }
            }
        } else {
            for (base, score) in scores.iter_mut().enumerate() {
                *score = pick(base);
            }
        }
        scores
    }

    // -- recursion ----------------------------------------------------------

    fn draw(&mut self, shanten: i8) -> Rc<Values> {
        if self.sup.calc_tegawari && self.state.n_extra_tumo == 0 {
            self.draw_with_tegawari(shanten)
        } else {
            self.draw_without_tegawari(shanten)
        }
    }

    fn draw_without_tegawari(&mut self, shanten: i8) -> Rc<Values> {
        if let Some(hit) = self.draw_cache[shanten as usize].get(&self.state) {
            return Rc::clone(hit);
        }

        let t = self.max_turns;
        let mut values = Values::zeros(t);
        let draw_tiles = self.get_draw_tiles(shanten);

        let sum_required: usize = draw_tiles
            .iter()
            .filter(|d| d.shanten_diff == -1)
            .map(|d| d.count as usize)
            .sum();
        let not_tumo = self.tables.not_tumo[sum_required].clone();

        for d in &draw_tiles {
            if d.shanten_diff != -1 || d.count == 0 {
                continue;
            }

            self.state.deal(d.tile);
            let scores_or_values = if shanten > 0 {
                ScoresOrValues::Values(self.discard_step(shanten - 1))
            } else {
                match self.get_score(d.tile) {
                    Some(scores) => ScoresOrValues::Scores(scores),
                    None => {
                        self.state.undo_deal(d.tile);
                        continue;
                    }
                }
            };
            self.state.undo_deal(d.tile);

            let tumo_probs = &self.tables.tumo[d.count as usize];
            for i in 0..t {
                let m = not_tumo[i];
                if m == 0.0 {
                    break;
                }
                for j in i..t {
                    let n = not_tumo[j];
                    if n == 0.0 {
                        break;
                    }
                    // Chance that the first useful draw is this tile on turn
                    // j, conditional on nothing useful up to turn i.
                    let prob = tumo_probs[j] * n / m;
                    match &scores_or_values {
                        ScoresOrValues::Scores(scores) => {
                            let bonus = (i == 0 && self.sup.calc_double_riichi) as usize
                                + (j == i && self.sup.calc_ippatsu) as usize
                                + (j == t - 1 && self.sup.calc_haitei) as usize;
                            values.win[i] += prob;
                            values.exp[i] += prob * scores[bonus];
                        }
                        ScoresOrValues::Values(next) => {
                            if shanten == 1 {
                                values.tenpai[i] += prob;
                            }
                            if j < t - 1 {
                                if shanten > 1 {
                                    values.tenpai[i] += prob * next.tenpai[j + 1];
                                }
                                values.win[i] += prob * next.win[j + 1];
                                values.exp[i] += prob * next.exp[j + 1];
                            }
                        }
                    }
                }
            }
        }

        let values = Rc::new(values);
        self.draw_cache[shanten as usize].insert(self.state.clone(), Rc::clone(&values));
        values
    }

    /// Draw stage with shape-trade enumeration. The survival model does not
    /// know which non-useful tiles already left the wall, so this stage
    /// folds every draw with the turn-invariant `count / wall` marginal;
    /// the per-turn marginal would push cumulative probabilities past one.
    fn draw_with_tegawari(&mut self, shanten: i8) -> Rc<Values> {
        if let Some(hit) = self.draw_cache[shanten as usize].get(&self.state) {
            return Rc::clone(hit);
        }

        let t = self.max_turns;
        let mut values = Values::zeros(t);
        let draw_tiles = self.get_draw_tiles(shanten);
        let wall = self.state.sum_left_tiles() as f64;

        for d in &draw_tiles {
            if d.shanten_diff != -1 || d.count == 0 {
                continue;
            }

            self.state.deal(d.tile);
            let scores_or_values = if shanten > 0 {
                ScoresOrValues::Values(self.discard_step(shanten - 1))
            } else {
                match self.get_score(d.tile) {
                    Some(scores) => ScoresOrValues::Scores(scores),
                    None => {
                        self.state.undo_deal(d.tile);
                        continue;
                    }
                }
            };
            self.state.undo_deal(d.tile);

            let prob = d.count as f64 / wall;
            for i in 0..t {
                match &scores_or_values {
                    ScoresOrValues::Scores(scores) => {
                        let bonus = (i == 0 && self.sup.calc_double_riichi) as usize
                            + self.sup.calc_ippatsu as usize
                            + (i == t - 1 && self.sup.calc_haitei) as usize;
                        values.win[i] += prob;
                        values.exp[i] += prob * scores[bonus];
                    }
                    ScoresOrValues::Values(next) => {
                        if shanten == 1 {
                            values.tenpai[i] += prob;
                        }
                        if i < t - 1 {
                            if shanten > 1 {
                                values.tenpai[i] += prob * next.tenpai[i + 1];
                            }
                            values.win[i] += prob * next.win[i + 1];
                            values.exp[i] += prob * next.exp[i + 1];
                        }
                    }
                }
            }
        }

        for d in &draw_tiles {
            if d.shanten_diff != 0 || d.count == 0 {
                continue;
            }

            self.state.deal(d.tile);
            self.state.n_extra_tumo += 1;
            let next = self.discard_step(shanten);
            self.state.n_extra_tumo -= 1;
            self.state.undo_deal(d.tile);

            let prob = d.count as f64 / wall;
            for i in 0..t - 1 {
                values.tenpai[i] += prob * next.tenpai[i + 1];
                values.win[i] += prob * next.win[i + 1];
                values.exp[i] += prob * next.exp[i + 1];
            }
        }

        let values = Rc::new(values);
        self.draw_cache[shanten as usize].insert(self.state.clone(), Rc::clone(&values));
        values
    }

    /// Discard stage: per turn, keep the best candidate's curves. Different
    /// turns may settle on different discards.
    fn discard_step(&mut self, shanten: i8) -> Rc<Values> {
        debug_assert!(shanten >= 0);
        if let Some(hit) = self.discard_cache[shanten as usize].get(&self.state) {
            return Rc::clone(hit);
        }

        let t = self.max_turns;
        let discard_tiles = self.get_discard_tiles(shanten);
        let mut best = Values::zeros(t);
        let mut best_keys = vec![i64::MIN; t];
        let mut best_tiles = vec![0u8; t];

        for d in &discard_tiles {
            let values = if d.shanten_diff == 0 {
                self.state.discard(d.tile);
                let v = self.draw(shanten);
                self.state.undo_discard(d.tile);
                v
            } else if d.shanten_diff == 1
                && self.sup.calc_shanten_down
                && self.state.n_extra_tumo == 0
                && shanten < SHANTEN_THRESHOLD
            {
                self.state.discard(d.tile);
                self.state.n_extra_tumo += 1;
                let v = self.draw(shanten + 1);
                self.state.n_extra_tumo -= 1;
                self.state.undo_discard(d.tile);
                v
            } else {
                continue;
            };

            for i in 0..t {
                // Win probabilities tie at four decimals, values at whole
                // points; ties fall to the static discard priority.
                let key = if self.sup.maximize_win_prob {
                    (values.win[i] * 10000.0) as i64
                } else {
                    values.exp[i] as i64
                };
                let better = key > best_keys[i]
                    || (key == best_keys[i]
                        && DISCARD_PRIORITIES[best_tiles[i] as usize]
                            < DISCARD_PRIORITIES[d.tile as usize]);
                if better {
                    best.tenpai[i] = values.tenpai[i];
                    best.win[i] = values.win[i];
                    best.exp[i] = values.exp[i];
                    best_keys[i] = key;
                    best_tiles[i] = d.tile;
                }
            }
        }

        let values = Rc::new(best);
        self.discard_cache[shanten as usize].insert(self.state.clone(), Rc::clone(&values));
        values
    }

    // -- analysis entry points ----------------------------------------------

    fn analyze_discard(&mut self, shanten: i8) -> Vec<Candidate> {
        let discard_tiles = self.get_discard_tiles(shanten);
        let mut candidates = Vec::with_capacity(discard_tiles.len());

        for d in discard_tiles {
            if d.shanten_diff == 0 {
                self.state.discard(d.tile);
                let required = self.get_required_tiles();
                let values = self.draw(shanten);
                self.state.undo_discard(d.tile);

                let mut tenpai = values.tenpai.clone();
                if shanten == 0 {
                    tenpai.fill(1.0);
                }
                candidates.push(Candidate::new(
                    Some(d.tile),
                    required,
                    tenpai,
                    values.win.clone(),
                    values.exp.clone(),
                    false,
                ));
            } else if d.shanten_diff == 1
                && self.sup.calc_shanten_down
                && shanten < SHANTEN_THRESHOLD
            {
                self.state.discard(d.tile);
                let required = self.get_required_tiles();
                self.state.n_extra_tumo += 1;
                let values = self.draw(shanten + 1);
                self.state.n_extra_tumo -= 1;
                self.state.undo_discard(d.tile);

                let mut tenpai = values.tenpai.clone();
                let mut win = values.win.clone();
                let mut exp = values.exp.clone();
                if self.sup.shift_shanten_down {
                    for v in [&mut tenpai, &mut win, &mut exp] {
                        v.rotate_left(1);
                        if let Some(last) = v.last_mut() {
                            *last = 0.0;
                        }
                    }
                }
                candidates.push(Candidate::new(Some(d.tile), required, tenpai, win, exp, true));
            } else if d.shanten_diff == 1 {
                // Regression either disabled or too deep: report the shape
                // change without curves.
                self.state.discard(d.tile);
                let required = self.get_required_tiles();
                self.state.undo_discard(d.tile);
                candidates.push(Candidate::new(
                    Some(d.tile),
                    required,
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                    self.sup.calc_shanten_down,
                ));
            }
        }
        candidates
    }

    fn analyze_draw(&mut self, shanten: i8) -> Vec<Candidate> {
        let required = self.get_required_tiles();
        let values = self.draw(shanten);

        let mut tenpai = values.tenpai.clone();
        if shanten == 0 {
            tenpai.fill(1.0);
        }
        vec![Candidate::new(
            None,
            required,
            tenpai,
            values.win.clone(),
            values.exp.clone(),
            false,
        )]
    }

    fn analyze_discard_simple(&mut self, shanten: i8) -> Vec<Candidate> {
        let discard_tiles = self.get_discard_tiles(shanten);
        let mut candidates = Vec::with_capacity(discard_tiles.len());
        for d in discard_tiles {
            self.state.discard(d.tile);
            let required = self.get_required_tiles();
            self.state.undo_discard(d.tile);
            candidates.push(Candidate::new(
                Some(d.tile),
                required,
                Vec::new(),
                Vec::new(),
                Vec::new(),
                d.shanten_diff == 1 && self.sup.calc_shanten_down,
            ));
        }
        candidates
    }

    fn analyze_draw_simple(&mut self) -> Vec<Candidate> {
        let required = self.get_required_tiles();
        vec![Candidate::new(
            None,
            required,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            false,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{EAST, SOUTH};

    fn hand(s: &str) -> Hand {
        s.parse().unwrap()
    }

    #[test]
    fn census_subtracts_everything() {
        let h = hand("123m055p(777s)");
        let counts = count_left_tiles(&h, &[tile::EAST]).unwrap();
        assert_eq!(counts[0], 3); // 1m
        assert_eq!(counts[13], 1); // 5p: three held (one red)
        assert_eq!(counts[35], 0); // red 5p gone
        assert_eq!(counts[24], 1); // 7s pon
        assert_eq!(counts[27], 3); // east indicator
        assert_eq!(counts[34], 1);
    }

    #[test]
    fn census_rejects_overdrawn_tiles() {
        let h = hand("1111m5p");
        assert!(matches!(
            count_left_tiles(&h, &[0]),
            Err(CalcError::InvalidTileCount(0))
        ));
    }

    #[test]
    fn prob_tables_shape() {
        let t = build_prob_tables(122, 17);
        assert_eq!(t.tumo[4][0], 4.0 / 122.0);
        assert_eq!(t.tumo[0][5], 0.0);
        assert_eq!(t.not_tumo[10][0], 1.0);
        // Survival is monotonically non-increasing.
        assert!(t.not_tumo[10].windows(2).all(|w| w[1] <= w[0]));
        // The degenerate all-useful row exists and dies after one turn.
        assert_eq!(t.not_tumo[122][1], 0.0);
    }

    #[test]
    fn uradora_rows_parse() {
        let text = "1 0 0 0 0 0 0 0 0 0 0 0 0\n0.5 0.5 0 0 0 0 0 0 0 0 0 0 0\n";
        let table = parse_uradora_table(text);
        assert_eq!(table.len(), 2);
        assert_eq!(table[1][1], 0.5);
        assert!(parse_uradora_table("1 2 3").is_empty());
    }

    #[test]
    fn search_restores_state_on_return() {
        let h = hand("222m567m345p3366s1z");
        let calc = ExpectedValueCalculator::new(
            ShantenKind::Union,
            CalcFlags::SHANTEN_DOWN | CalcFlags::TEGAWARI,
        );
        let score = ScoreCalculator::new(EAST, SOUTH);
        let counts = count_left_tiles(&h, &[]).unwrap();
        let mut search = Search {
            sup: &calc,
            score_calculator: &score,
            dora_indicators: &[],
            melds: &h.melds,
            is_menzen: true,
            len_div3: h.len_div3(),
            max_turns: 17,
            tables: build_prob_tables(122, 17),
            state: SearchState {
                hand_counts: h.counts,
                akas_in_hand: h.akas,
                counts,
                n_extra_tumo: 0,
            },
            draw_cache: Default::default(),
            discard_cache: Default::default(),
            score_cache: AHashMap::new(),
        };

        let shanten = shanten::calc_shanten(&h, ShantenKind::Union);
        let before = search.state.clone();
        search.discard_step(shanten);
        assert!(search.state == before);
        // Drop to 13 tiles and run the draw stage as well.
        search.state.discard(27);
        let before = search.state.clone();
        search.draw(shanten);
        assert!(search.state == before);
    }

    #[test]
    fn red_five_split_in_draw_enumeration() {
        let h = hand("123m067p88s22256m");
        let calc = ExpectedValueCalculator::new(ShantenKind::Union, CalcFlags::RED_FIVE_DRAWS);
        let score = ScoreCalculator::new(EAST, SOUTH);
        let counts = count_left_tiles(&h, &[]).unwrap();
        let search = Search {
            sup: &calc,
            score_calculator: &score,
            dora_indicators: &[],
            melds: &h.melds,
            is_menzen: true,
            len_div3: h.len_div3(),
            max_turns: 18,
            tables: build_prob_tables(123, 18),
            state: SearchState {
                hand_counts: h.counts,
                akas_in_hand: h.akas,
                counts,
                n_extra_tumo: 0,
            },
            draw_cache: Default::default(),
            discard_cache: Default::default(),
            score_cache: AHashMap::new(),
        };
        let shanten = shanten::calc_shanten(&h, ShantenKind::Union);
        let draws = search.get_draw_tiles(shanten);
        // The red 5s is still live: 5s appears as plain (3 copies) + red (1).
        let fives: Vec<_> = draws
            .iter()
            .filter(|d| tile::normalize(d.tile) == tile::SOUZU5)
            .collect();
        let plain = fives.iter().find(|d| d.tile == tile::SOUZU5).unwrap();
        let red = fives.iter().find(|d| d.tile == tile::RED_SOUZU5).unwrap();
        assert_eq!(plain.count, 3);
        assert_eq!(red.count, 1);
        // The red 5p sits in the hand, so 5p draws stay unsplit.
        let fives_p: Vec<_> = draws.iter().filter(|d| tile::normalize(d.tile) == tile::PINZU5).collect();
        assert_eq!(fives_p.len(), 1);
        assert_eq!(fives_p[0].count, 3);
    }
}
