//! Yaku detection and fu counting for completed hands.
//!
//! Every head+mentsu division of the concealed tiles is scored together with
//! the melds and the best (han, then fu) reading wins. Turn-dependent
//! bonuses (double riichi, ippatsu, haitei) are not decided here; the search
//! engine selects them per leaf via the extra-han score vector.

use crate::agari::{self, Division, Mentsu};
use crate::hand::{Hand, Meld, MeldType};
use crate::tile::{self, CHUN, HAKU, HATSU, TILE_KINDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yaku {
    MenzenTsumo,
    Riichi,
    Pinfu,
    Tanyao,
    Haku,
    Hatsu,
    Chun,
    SeatWind,
    RoundWind,
    Iipeiko,
    Ryanpeiko,
    SanshokuDoujun,
    SanshokuDoukou,
    Ittsuu,
    Chanta,
    Junchan,
    Toitoi,
    Sanankou,
    Shousangen,
    Honroutou,
    Chiitoitsu,
    Honitsu,
    Chinitsu,
    Dora,
    AkaDora,
    // yakuman
    KokushiMusou,
    Suuankou,
    Daisangen,
    Tsuuiisou,
    Chinroutou,
    Ryuuiisou,
    Shousuushii,
    Daisuushii,
}

impl Yaku {
    pub fn name(self) -> &'static str {
        match self {
            Yaku::MenzenTsumo => "Menzen Tsumo",
            Yaku::Riichi => "Riichi",
            Yaku::Pinfu => "Pinfu",
            Yaku::Tanyao => "Tanyao",
            Yaku::Haku => "Haku",
            Yaku::Hatsu => "Hatsu",
            Yaku::Chun => "Chun",
            Yaku::SeatWind => "Seat Wind",
            Yaku::RoundWind => "Round Wind",
            Yaku::Iipeiko => "Iipeiko",
            Yaku::Ryanpeiko => "Ryanpeikou",
            Yaku::SanshokuDoujun => "Sanshoku Doujun",
            Yaku::SanshokuDoukou => "Sanshoku Doukou",
            Yaku::Ittsuu => "Ittsuu",
            Yaku::Chanta => "Chanta",
            Yaku::Junchan => "Junchan",
            Yaku::Toitoi => "Toitoi",
            Yaku::Sanankou => "Sanankou",
            Yaku::Shousangen => "Shousangen",
            Yaku::Honroutou => "Honroutou",
            Yaku::Chiitoitsu => "Chiitoitsu",
            Yaku::Honitsu => "Honitsu",
            Yaku::Chinitsu => "Chinitsu",
            Yaku::Dora => "Dora",
            Yaku::AkaDora => "Aka Dora",
            Yaku::KokushiMusou => "Kokushi Musou",
            Yaku::Suuankou => "Suuankou",
            Yaku::Daisangen => "Daisangen",
            Yaku::Tsuuiisou => "Tsuuiisou",
            Yaku::Chinroutou => "Chinroutou",
            Yaku::Ryuuiisou => "Ryuuiisou",
            Yaku::Shousuushii => "Shousuushii",
            Yaku::Daisuushii => "Daisuushii",
        }
    }
}

#[derive(Debug, Clone)]
pub struct YakuContext {
    pub is_menzen: bool,
    pub is_riichi: bool,
    pub is_tsumo: bool,
    /// Round wind tile (27..=30).
    pub bakaze: u8,
    /// Seat wind tile (27..=30).
    pub jikaze: u8,
    pub num_dora: u8,
    pub num_aka: u8,
}

#[derive(Debug, Clone, Default)]
pub struct YakuResult {
    pub han: u8,
    pub fu: u8,
    /// Number of stacked yakuman; when nonzero `han`/`fu` are not used.
    pub yakuman: u8,
    pub yaku: Vec<Yaku>,
}

impl YakuResult {
    fn add(&mut self, yaku: Yaku, han: u8) {
        self.han += han;
        self.yaku.push(yaku);
    }

    pub fn has_yaku(&self) -> bool {
        self.yakuman > 0 || self.yaku.iter().any(|y| !matches!(y, Yaku::Dora | Yaku::AkaDora))
    }
}

/// Concealed plus melded tiles per base kind.
fn all_counts(hand: &Hand) -> [u8; TILE_KINDS] {
    let mut counts = hand.counts;
    for meld in &hand.melds {
        for &t in &meld.tiles {
            counts[tile::normalize(t) as usize] += 1;
        }
    }
    counts
}

/// Evaluate a completed hand. `win_tile` must already be inside the hand.
pub fn calculate_yaku(hand: &Hand, ctx: &YakuContext, win_tile: u8) -> YakuResult {
    let win_tile = tile::normalize(win_tile);

    if hand.is_menzen() && agari::is_kokushi(&hand.counts) {
        let mut res = YakuResult {
            yakuman: 1,
            ..YakuResult::default()
        };
        res.yaku.push(Yaku::KokushiMusou);
        return res;
    }

    let divisions = agari::find_divisions(&hand.counts);
    let mut best = YakuResult::default();

    if divisions.is_empty() {
        if hand.is_menzen() && agari::is_chiitoitsu(&hand.counts) {
            best = score_chiitoitsu(hand, ctx);
        }
        return best;
    }

    for div in &divisions {
        for wait in win_groups(div, win_tile) {
            let res = score_division(hand, ctx, div, wait, win_tile);
            let better = res.yakuman > best.yakuman
                || (res.yakuman == best.yakuman
                    && (res.han > best.han || (res.han == best.han && res.fu > best.fu)));
            if better {
                best = res;
            }
        }
    }
    best
}

/// Groups of a division that could have absorbed the winning tile. `None`
/// stands for the head (tanki).
fn win_groups(div: &Division, win_tile: u8) -> Vec<Option<usize>> {
    let mut groups = Vec::new();
    if div.head == win_tile {
        groups.push(None);
    }
    for (idx, m) in div.body.iter().enumerate() {
        let hit = match *m {
            Mentsu::Koutsu(t) => t == win_tile,
            Mentsu::Shuntsu(t) => (t..=t + 2).contains(&win_tile),
        };
        if hit {
            groups.push(Some(idx));
        }
    }
    groups
}

fn score_chiitoitsu(hand: &Hand, ctx: &YakuContext) -> YakuResult {
    let mut res = YakuResult {
        fu: 25,
        ..YakuResult::default()
    };
    let counts = all_counts(hand);
    if counts[..27].iter().all(|&c| c == 0) {
        res.yakuman = 1;
        res.yaku.push(Yaku::Tsuuiisou);
        return res;
    }
    if counts.iter().take(27).enumerate().all(|(i, &c)| c == 0 || !tile::is_number_terminal(i as u8))
        && counts[27..].iter().all(|&c| c == 0)
    {
        res.add(Yaku::Tanyao, 1);
    }
    if is_flush(&counts, false) {
        res.add(Yaku::Chinitsu, 6);
    } else if is_flush(&counts, true) {
        res.add(Yaku::Honitsu, 3);
    }
    if counts.iter().enumerate().all(|(i, &c)| c == 0 || tile::is_yaochuu(i as u8)) {
        res.add(Yaku::Honroutou, 2);
    }
    res.add(Yaku::Chiitoitsu, 2);
    add_static_yaku(&mut res, ctx);
    add_dora(&mut res, ctx);
    res
}

fn score_division(
    hand: &Hand,
    ctx: &YakuContext,
    div: &Division,
    wait: Option<usize>,
    win_tile: u8,
) -> YakuResult {
    let counts = all_counts(hand);
    let melds = &hand.melds;

    if let Some(res) = check_yakuman(hand, ctx, div, wait, &counts) {
        return res;
    }

    let mut res = YakuResult::default();
    add_static_yaku(&mut res, ctx);

    if counts.iter().enumerate().all(|(i, &c)| c == 0 || !tile::is_yaochuu(i as u8)) {
        res.add(Yaku::Tanyao, 1);
    }

    let pinfu = check_pinfu(div, melds, ctx, wait, win_tile);
    if pinfu {
        res.add(Yaku::Pinfu, 1);
    }

    // Yakuhai koutsu: dragons plus seat/round winds, counted independently.
    for (yaku, t) in [
        (Yaku::Haku, HAKU),
        (Yaku::Hatsu, HATSU),
        (Yaku::Chun, CHUN),
        (Yaku::RoundWind, ctx.bakaze),
        (Yaku::SeatWind, ctx.jikaze),
    ] {
        if has_koutsu_of(div, melds, t) {
            res.add(yaku, 1);
        }
    }

    let dragon_koutsu = [HAKU, HATSU, CHUN]
        .iter()
        .filter(|&&t| has_koutsu_of(div, melds, t))
        .count();
    if dragon_koutsu == 2 && (HAKU..=CHUN).contains(&div.head) {
        res.add(Yaku::Shousangen, 2);
    }

    let koutsu_total = div
        .body
        .iter()
        .filter(|m| matches!(m, Mentsu::Koutsu(_)))
        .count()
        + melds.iter().filter(|m| m.meld_type == MeldType::Pon).count();
    if koutsu_total == 4 {
        res.add(Yaku::Toitoi, 2);
    }

    if closed_koutsu_count(div, ctx, wait) == 3 {
        res.add(Yaku::Sanankou, 2);
    }

    if ctx.is_menzen {
        match identical_run_pairs(div) {
            2 => res.add(Yaku::Ryanpeiko, 3),
            1 => res.add(Yaku::Iipeiko, 1),
            _ => {}
        }
    }

    let open_minus = |closed: u8| if ctx.is_menzen { closed } else { closed - 1 };
    if has_ittsuu(div, melds) {
        res.add(Yaku::Ittsuu, open_minus(2));
    }
    if has_sanshoku_doujun(div, melds) {
        res.add(Yaku::SanshokuDoujun, open_minus(2));
    }
    if has_sanshoku_doukou(div, melds) {
        res.add(Yaku::SanshokuDoukou, 2);
    }

    if is_flush(&counts, false) {
        res.add(Yaku::Chinitsu, open_minus(6));
    } else if is_flush(&counts, true) {
        res.add(Yaku::Honitsu, open_minus(3));
    }

    if counts.iter().enumerate().all(|(i, &c)| c == 0 || tile::is_yaochuu(i as u8)) {
        res.add(Yaku::Honroutou, 2);
    } else if is_terminal_in_every_group(div, melds, false) {
        res.add(Yaku::Junchan, open_minus(3));
    } else if is_terminal_in_every_group(div, melds, true) {
        res.add(Yaku::Chanta, open_minus(2));
    }

    res.fu = if pinfu && ctx.is_tsumo {
        20
    } else if pinfu {
        30
    } else {
        calculate_fu(div, melds, ctx, wait, win_tile)
    };

    add_dora(&mut res, ctx);
    res
}

fn add_static_yaku(res: &mut YakuResult, ctx: &YakuContext) {
    if ctx.is_menzen && ctx.is_tsumo {
        res.add(Yaku::MenzenTsumo, 1);
    }
    if ctx.is_riichi {
        res.add(Yaku::Riichi, 1);
    }
}

fn add_dora(res: &mut YakuResult, ctx: &YakuContext) {
    if !res.has_yaku() {
        return;
    }
    if ctx.num_dora > 0 {
        res.add(Yaku::Dora, ctx.num_dora);
    }
    if ctx.num_aka > 0 {
        res.add(Yaku::AkaDora, ctx.num_aka);
    }
}

fn check_yakuman(
    hand: &Hand,
    ctx: &YakuContext,
    div: &Division,
    wait: Option<usize>,
    counts: &[u8; TILE_KINDS],
) -> Option<YakuResult> {
    let melds = &hand.melds;
    let mut res = YakuResult::default();

    if closed_koutsu_count(div, ctx, wait) == 4 && ctx.is_menzen {
        res.yakuman += 1;
        res.yaku.push(Yaku::Suuankou);
    }
    if [HAKU, HATSU, CHUN].iter().all(|&t| has_koutsu_of(div, melds, t)) {
        res.yakuman += 1;
        res.yaku.push(Yaku::Daisangen);
    }
    let wind_koutsu = (27..=30).filter(|&t| has_koutsu_of(div, melds, t)).count();
    if wind_koutsu == 4 {
        res.yakuman += 1;
        res.yaku.push(Yaku::Daisuushii);
    } else if wind_koutsu == 3 && (27..=30).contains(&div.head) {
        res.yakuman += 1;
        res.yaku.push(Yaku::Shousuushii);
    }
    if counts[..27].iter().all(|&c| c == 0) {
        res.yakuman += 1;
        res.yaku.push(Yaku::Tsuuiisou);
    }
    if counts.iter().enumerate().all(|(i, &c)| c == 0 || tile::is_number_terminal(i as u8)) {
        res.yakuman += 1;
        res.yaku.push(Yaku::Chinroutou);
    }
    const GREENS: [usize; 6] = [19, 20, 21, 23, 25, 32];
    if counts
        .iter()
        .enumerate()
        .all(|(i, &c)| c == 0 || GREENS.contains(&i))
    {
        res.yakuman += 1;
        res.yaku.push(Yaku::Ryuuiisou);
    }

    (res.yakuman > 0).then_some(res)
}

fn has_koutsu_of(div: &Division, melds: &[Meld], t: u8) -> bool {
    div.body
        .iter()
        .any(|m| matches!(m, Mentsu::Koutsu(k) if *k == t))
        || melds
            .iter()
            .any(|m| m.meld_type == MeldType::Pon && m.base() == t)
}

/// Concealed koutsu; a ron completing a koutsu counts as open.
fn closed_koutsu_count(div: &Division, ctx: &YakuContext, wait: Option<usize>) -> usize {
    div.body
        .iter()
        .enumerate()
        .filter(|(idx, m)| {
            matches!(m, Mentsu::Koutsu(_)) && (ctx.is_tsumo || wait != Some(*idx))
        })
        .count()
}

fn identical_run_pairs(div: &Division) -> usize {
    let mut runs: Vec<u8> = div
        .body
        .iter()
        .filter_map(|m| match m {
            Mentsu::Shuntsu(t) => Some(*t),
            _ => None,
        })
        .collect();
    runs.sort_unstable();
    let mut pairs = 0;
    let mut i = 0;
    while i + 1 < runs.len() {
        if runs[i] == runs[i + 1] {
            pairs += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs
}

fn run_starts(div: &Division, melds: &[Meld]) -> Vec<u8> {
    let mut starts: Vec<u8> = div
        .body
        .iter()
        .filter_map(|m| match m {
            Mentsu::Shuntsu(t) => Some(*t),
            _ => None,
        })
        .collect();
    starts.extend(
        melds
            .iter()
            .filter(|m| m.meld_type == MeldType::Chi)
            .map(|m| m.base()),
    );
    starts
}

fn has_ittsuu(div: &Division, melds: &[Meld]) -> bool {
    let starts = run_starts(div, melds);
    (0..3).any(|suit| {
        [0, 3, 6]
            .iter()
            .all(|&r| starts.contains(&(suit * 9 + r)))
    })
}

fn has_sanshoku_doujun(div: &Division, melds: &[Meld]) -> bool {
    let starts = run_starts(div, melds);
    (0..7).any(|r| (0..3).all(|suit| starts.contains(&(suit * 9 + r))))
}

fn has_sanshoku_doukou(div: &Division, melds: &[Meld]) -> bool {
    let mut koutsu: Vec<u8> = div
        .body
        .iter()
        .filter_map(|m| match m {
            Mentsu::Koutsu(t) if *t < 27 => Some(*t),
            _ => None,
        })
        .collect();
    koutsu.extend(
        melds
            .iter()
            .filter(|m| m.meld_type == MeldType::Pon && m.base() < 27)
            .map(|m| m.base()),
    );
    (0..9).any(|r| (0..3).all(|suit| koutsu.contains(&(suit * 9 + r))))
}

/// `with_honors = true` checks honitsu, `false` checks chinitsu.
fn is_flush(counts: &[u8; TILE_KINDS], with_honors: bool) -> bool {
    let mut suits = [false; 3];
    let mut honors = false;
    for (i, &c) in counts.iter().enumerate() {
        if c == 0 {
            continue;
        }
        if i < 27 {
            suits[i / 9] = true;
        } else {
            honors = true;
        }
    }
    let one_suit = suits.iter().filter(|&&s| s).count() == 1;
    if with_honors {
        one_suit && honors
    } else {
        one_suit && !honors
    }
}

/// Every group (and the head) contains a terminal; `honors_ok` distinguishes
/// chanta from junchan. Chanta additionally requires an honor somewhere.
fn is_terminal_in_every_group(div: &Division, melds: &[Meld], honors_ok: bool) -> bool {
    let good = |t: u8| {
        if honors_ok {
            tile::is_yaochuu(t)
        } else {
            tile::is_number_terminal(t)
        }
    };
    if !good(div.head) {
        return false;
    }
    let mut has_honor = tile::is_honor(div.head);
    for m in &div.body {
        match *m {
            Mentsu::Koutsu(t) => {
                if !good(t) {
                    return false;
                }
                has_honor |= tile::is_honor(t);
            }
            Mentsu::Shuntsu(t) => {
                if !tile::is_number_terminal(t) && !tile::is_number_terminal(t + 2) {
                    return false;
                }
            }
        }
    }
    for m in melds {
        match m.meld_type {
            MeldType::Pon => {
                let t = m.base();
                if !good(t) {
                    return false;
                }
                has_honor |= tile::is_honor(t);
            }
            MeldType::Chi => {
                let t = m.base();
                if !tile::is_number_terminal(t) && !tile::is_number_terminal(t + 2) {
                    return false;
                }
            }
        }
    }
    !honors_ok || has_honor
}

fn check_pinfu(
    div: &Division,
    melds: &[Meld],
    ctx: &YakuContext,
    wait: Option<usize>,
    win_tile: u8,
) -> bool {
    if !ctx.is_menzen || !melds.is_empty() {
        return false;
    }
    if div.body.iter().any(|m| matches!(m, Mentsu::Koutsu(_))) {
        return false;
    }
    if div.head >= HAKU || div.head == ctx.bakaze || div.head == ctx.jikaze {
        return false;
    }
    // The wait must be an open-ended run.
    match wait {
        Some(idx) => match div.body[idx] {
            Mentsu::Shuntsu(t) => {
                (win_tile == t && t % 9 != 6) || (win_tile == t + 2 && t % 9 != 0)
            }
            Mentsu::Koutsu(_) => false,
        },
        None => false,
    }
}

fn calculate_fu(
    div: &Division,
    melds: &[Meld],
    ctx: &YakuContext,
    wait: Option<usize>,
    win_tile: u8,
) -> u8 {
    let mut fu: u8 = 20;
    if ctx.is_tsumo {
        fu += 2;
    } else if ctx.is_menzen {
        fu += 10;
    }

    if div.head == ctx.bakaze {
        fu += 2;
    }
    if div.head == ctx.jikaze {
        fu += 2;
    }
    if div.head >= HAKU {
        fu += 2;
    }

    match wait {
        None => fu += 2, // tanki
        Some(idx) => {
            if let Mentsu::Shuntsu(t) = div.body[idx] {
                let kanchan = win_tile == t + 1;
                let penchan =
                    (win_tile == t + 2 && t % 9 == 0) || (win_tile == t && t % 9 == 6);
                if kanchan || penchan {
                    fu += 2;
                }
            }
        }
    }

    for (idx, m) in div.body.iter().enumerate() {
        if let Mentsu::Koutsu(t) = *m {
            // A ron completing the koutsu scores it as open.
            let mut f = if !ctx.is_tsumo && wait == Some(idx) { 2 } else { 4 };
            if tile::is_yaochuu(t) {
                f *= 2;
            }
            fu += f;
        }
    }
    for m in melds {
        if m.meld_type == MeldType::Pon {
            let mut f = 2;
            if tile::is_yaochuu(m.base()) {
                f *= 2;
            }
            fu += f;
        }
    }

    if fu == 20 && !ctx.is_tsumo {
        fu = 30;
    }
    fu.div_ceil(10) * 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::EAST;

    fn ctx() -> YakuContext {
        YakuContext {
            is_menzen: true,
            is_riichi: false,
            is_tsumo: true,
            bakaze: EAST,
            jikaze: EAST,
            num_dora: 0,
            num_aka: 0,
        }
    }

    fn hand(s: &str) -> Hand {
        s.parse().unwrap()
    }

    #[test]
    fn pinfu_tsumo() {
        // 234m 567m 234p 567s 88s, won on 7s with a 56s wait.
        let res = calculate_yaku(&hand("234567m234p56788s"), &ctx(), 24);
        assert!(res.yaku.contains(&Yaku::Pinfu));
        assert!(res.yaku.contains(&Yaku::MenzenTsumo));
        assert!(res.yaku.contains(&Yaku::Tanyao));
        assert_eq!(res.fu, 20);
        assert_eq!(res.han, 3);
    }

    #[test]
    fn yakuhai_and_fu() {
        // 111z koutsu doubles as round and seat wind for an east dealer.
        let res = calculate_yaku(&hand("234m567p22678s111z"), &ctx(), 24);
        assert!(res.yaku.contains(&Yaku::RoundWind));
        assert!(res.yaku.contains(&Yaku::SeatWind));
        // 20 base + 2 tsumo + 8 closed honor koutsu + 2 kanchan = 32 -> 40
        assert_eq!(res.fu, 40);
    }

    #[test]
    fn chiitoitsu_scores_25_fu() {
        let res = calculate_yaku(&hand("1199m3377p55s1177z"), &ctx(), 0);
        assert!(res.yaku.contains(&Yaku::Chiitoitsu));
        assert_eq!(res.fu, 25);
        assert_eq!(res.han, 3); // chiitoitsu + menzen tsumo
    }

    #[test]
    fn open_hand_without_yaku() {
        // Open hand, no yakuhai, terminals kill tanyao: nothing scores.
        let mut c = ctx();
        c.is_menzen = false;
        let res = calculate_yaku(&hand("456p99p123999s(234m)"), &c, 20);
        assert!(!res.has_yaku());
    }

    #[test]
    fn toitoi_open() {
        let mut c = ctx();
        c.is_menzen = false;
        let res = calculate_yaku(&hand("222m333p44s(555s)(777s)"), &c, 1);
        assert!(res.yaku.contains(&Yaku::Toitoi));
    }

    #[test]
    fn kokushi_is_yakuman() {
        let res = calculate_yaku(&hand("19m19p19s12345677z"), &ctx(), 33);
        assert_eq!(res.yakuman, 1);
        assert!(res.yaku.contains(&Yaku::KokushiMusou));
    }

    #[test]
    fn suuankou_on_tsumo() {
        let res = calculate_yaku(&hand("111m444m777p888s55z"), &ctx(), 15);
        assert_eq!(res.yakuman, 1);
        assert!(res.yaku.contains(&Yaku::Suuankou));
    }

    #[test]
    fn dora_never_makes_a_hand_valid() {
        let mut c = ctx();
        c.is_menzen = false;
        c.num_dora = 2;
        let res = calculate_yaku(&hand("456p99p123999s(234m)"), &c, 20);
        assert!(!res.has_yaku());
        assert_eq!(res.han, 0);
    }
}
