//! End-to-end scenarios for the expected-value engine.

use riichi_ev::shanten::calc_shanten;
use riichi_ev::tile::{self, EAST, SOUTH};
use riichi_ev::{
    CalcFlags, CalcError, Candidate, ExpectedValueCalculator, Hand, ScoreCalculator, ShantenKind,
};

fn hand(s: &str) -> Hand {
    s.parse().unwrap()
}

fn run(hand: &Hand, indicators: &[u8], flags: CalcFlags) -> Vec<Candidate> {
    let dora: Vec<u8> = indicators.iter().map(|&t| tile::next_dora(t)).collect();
    let score = ScoreCalculator::new(EAST, SOUTH).with_dora(dora);
    ExpectedValueCalculator::new(ShantenKind::Union, flags)
        .calc(hand, &score, indicators)
        .unwrap()
}

fn find<'a>(candidates: &'a [Candidate], tile: u8) -> &'a Candidate {
    candidates
        .iter()
        .find(|c| c.tile == Some(tile))
        .unwrap_or_else(|| panic!("no candidate discarding {}", tile::name(tile)))
}

/// Scenario: already tenpai, one candidate per held kind, and the discards
/// that keep tenpai carry a saturated tenpai curve.
#[test]
fn tenpai_hand_keeps_full_tenpai_curve() {
    let h = hand("222567m345p33667s");
    let candidates = run(&h, &[], CalcFlags::NONE);

    let mut held: Vec<u8> = (0..34).filter(|&k| h.counts[k as usize] > 0).collect();
    let mut reported: Vec<u8> = candidates.iter().filter_map(|c| c.tile).collect();
    held.sort_unstable();
    reported.sort_unstable();
    assert_eq!(held, reported);

    // 6s and 7s keep the hand tenpai; their curves are pinned at 1.
    for keep in [23u8, 24] {
        let c = find(&candidates, keep);
        assert_eq!(c.tenpai_probs.len(), 17);
        assert!(c.tenpai_probs.iter().all(|&p| p == 1.0));
        assert!(c.win_probs[0] > 0.0);
    }
    // Shape-regressing discards are reported without curves, and never as
    // regression searches when the flag is off.
    let c = find(&candidates, 1);
    assert!(c.tenpai_probs.is_empty());
    assert!(candidates.iter().all(|c| !c.shanten_down));
}

/// Scenario: the lone honor is the clear discard and wins follow.
#[test]
fn lone_honor_is_best_discard() {
    let h = hand("222567m34p33667s1z");
    let candidates = run(&h, &[], CalcFlags::NONE);
    assert_eq!(candidates[0].tile, Some(EAST));
    assert!(candidates[0].win_probs[0] > 0.0);
    assert!(candidates[0].tenpai_probs[0] > 0.0);
}

/// Scenario: chiitoitsu analysis reports exactly the pairing tile.
#[test]
fn chiitoitsu_required_tiles() {
    let h = hand("1122m3344p55s667z");
    let score = ScoreCalculator::new(EAST, SOUTH);
    let candidates = ExpectedValueCalculator::new(ShantenKind::Chiitoitsu, CalcFlags::NONE)
        .calc(&h, &score, &[])
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].tile, None);

    let singles: Vec<u8> = (0..34).filter(|&k| h.counts[k as usize] == 1).collect();
    let required: Vec<u8> = candidates[0].required_tiles.iter().map(|r| r.tile).collect();
    assert_eq!(required, singles);
    for r in &candidates[0].required_tiles {
        assert_eq!(r.count, 3);
    }
}

/// Scenario: an open hand whose only wait has no yaku. Keeping tenpai is
/// worth nothing; backing off one shanten opens a yakuhai path.
#[test]
fn shanten_back_beats_worthless_tenpai() {
    let h = hand("567m456p99p12s5z(234m)");

    // Baseline: the only shanten-keeping discard is the haku, and its wait
    // never pays.
    let baseline = run(&h, &[], CalcFlags::NONE);
    let keep = find(&baseline, tile::HAKU);
    assert!(keep.tenpai_probs.iter().all(|&p| p == 1.0));
    assert!(keep.win_probs.iter().all(|&p| p == 0.0));
    assert!(keep.exp_values.iter().all(|&v| v == 0.0));

    // With regression allowed, breaking the dead wait strictly beats it.
    let candidates = run(&h, &[], CalcFlags::SHANTEN_DOWN);
    let keep = find(&candidates, tile::HAKU);
    let best_back = candidates
        .iter()
        .filter(|c| c.shanten_down && !c.exp_values.is_empty())
        .max_by(|a, b| a.exp_values[0].total_cmp(&b.exp_values[0]))
        .expect("regression candidates exist");
    assert!(best_back.exp_values[0] > keep.exp_values[0]);
}

/// Scenario: uradora blending strictly raises expected values of a closed
/// tenpai hand when one indicator is visible.
#[test]
fn uradora_raises_expected_values() {
    let h = hand("222567m345p33667s");
    let indicators = [EAST];
    let without = run(&h, &indicators, CalcFlags::NONE);
    let with = run(&h, &indicators, CalcFlags::URADORA);

    for keep in [23u8, 24] {
        let c_without = find(&without, keep);
        let c_with = find(&with, keep);
        for (a, b) in c_with.exp_values.iter().zip(&c_without.exp_values) {
            assert!(a > b, "expected {a} > {b}");
        }
    }
}

/// Scenario: a winning hand is rejected outright.
#[test]
fn winning_hand_is_an_error() {
    let h = hand("123456789m12344p");
    let score = ScoreCalculator::new(EAST, SOUTH);
    let result = ExpectedValueCalculator::new(ShantenKind::Union, CalcFlags::NONE)
        .calc(&h, &score, &[]);
    assert!(matches!(result, Err(CalcError::AlreadyWinning)));
}

#[test]
fn wrong_hand_size_is_an_error() {
    let h = hand("123m456p");
    let score = ScoreCalculator::new(EAST, SOUTH);
    let result = ExpectedValueCalculator::new(ShantenKind::Union, CalcFlags::NONE)
        .calc(&h, &score, &[]);
    assert!(matches!(result, Err(CalcError::InvalidHandSize(6))));
}

/// Boundary: four shanten or worse only yields useful-tile data.
#[test]
fn far_hands_get_tile_lists_only() {
    let h = hand("147m258p369s12345z");
    assert!(calc_shanten(&h, ShantenKind::Union) >= 4);
    let candidates = run(&h, &[], CalcFlags::NONE);
    assert_eq!(candidates.len(), 14);
    for c in &candidates {
        assert!(c.tenpai_probs.is_empty());
        assert!(c.win_probs.is_empty());
        assert!(c.exp_values.is_empty());
        assert!(!c.shanten_down);
    }
    assert!(candidates.iter().any(|c| !c.required_tiles.is_empty()));
}

/// A 13-tile input always produces exactly one candidate with no discard.
#[test]
fn thirteen_tiles_single_candidate() {
    let h = hand("222567m345p336s1z");
    let candidates = run(&h, &[], CalcFlags::NONE);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].tile, None);
    assert_eq!(candidates[0].tenpai_probs.len(), 18);
}

/// Curves stay within bounds and win never exceeds tenpai.
#[test]
fn curves_are_probabilities() {
    let h = hand("222567m34p33667s1z");
    for flags in [
        CalcFlags::NONE,
        CalcFlags::SHANTEN_DOWN | CalcFlags::TEGAWARI,
        CalcFlags::IPPATSU | CalcFlags::HAITEI | CalcFlags::DOUBLE_RIICHI,
    ] {
        for c in run(&h, &[], flags) {
            for i in 0..c.tenpai_probs.len() {
                assert!((0.0..=1.0).contains(&c.tenpai_probs[i]));
                assert!((0.0..=1.0).contains(&c.win_probs[i]));
                assert!(c.win_probs[i] <= c.tenpai_probs[i] + 1e-9);
                assert!(c.exp_values[i] >= 0.0);
            }
        }
    }
}

/// Two identical calls agree bit for bit, and runs with other flags in
/// between leave the baseline untouched.
#[test]
fn analysis_is_deterministic() {
    let h = hand("222567m34p33667s1z");
    let baseline = run(&h, &[EAST], CalcFlags::NONE);
    for flags in [
        CalcFlags::SHANTEN_DOWN,
        CalcFlags::TEGAWARI,
        CalcFlags::DOUBLE_RIICHI,
        CalcFlags::IPPATSU,
        CalcFlags::HAITEI,
        CalcFlags::URADORA,
        CalcFlags::RED_FIVE_DRAWS,
        CalcFlags::MAXIMIZE_WIN_PROB,
    ] {
        let _ = run(&h, &[EAST], flags);
        assert_eq!(run(&h, &[EAST], CalcFlags::NONE), baseline);
    }
}

/// The input hand itself is never mutated by an analysis.
#[test]
fn input_hand_is_left_alone() {
    let h = hand("222567m34p33667s1z");
    let before = h.clone();
    let _ = run(&h, &[EAST], CalcFlags::SHANTEN_DOWN | CalcFlags::TEGAWARI);
    assert_eq!(h, before);
}

/// Useful tiles do not depend on the order tiles entered the hand.
#[test]
fn permutation_invariance() {
    let tiles = [1u8, 1, 1, 4, 5, 6, 11, 12, 20, 20, 23, 23, 24, 27];
    let mut reversed = tiles;
    reversed.reverse();
    let a = Hand::from_tiles(&tiles, vec![]).unwrap();
    let b = Hand::from_tiles(&reversed, vec![]).unwrap();
    assert_eq!(
        run(&a, &[], CalcFlags::NONE),
        run(&b, &[], CalcFlags::NONE)
    );
}

/// Red five preference: with a spare plain five the red is kept in hand.
#[test]
fn red_five_discard_preference() {
    // 055p holds the red five plus two plain copies.
    let h = hand("222567m055p3366s1z");
    let candidates = run(&h, &[], CalcFlags::NONE);
    assert!(candidates.iter().any(|c| c.tile == Some(tile::PINZU5)));
    assert!(candidates.iter().all(|c| c.tile != Some(tile::RED_PINZU5)));

    // With a single red five, the red id itself is reported.
    let h = hand("222567m0p336677s1z");
    let candidates = run(&h, &[], CalcFlags::NONE);
    assert!(candidates.iter().any(|c| c.tile == Some(tile::RED_PINZU5)));
    assert!(candidates.iter().all(|c| c.tile != Some(tile::PINZU5)));
}

mod random_hands {
    use super::*;
    use proptest::prelude::*;

    fn deck() -> Vec<u8> {
        (0u16..136).map(|i| (i / 4) as u8).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Any legal 13-tile hand analyzes without panicking, leaves its
        /// input untouched, and produces bounded curves.
        #[test]
        fn calc_holds_invariants(tiles in proptest::sample::subsequence(deck(), 13)) {
            let h = Hand::from_tiles(&tiles, vec![]).unwrap();
            let before = h.clone();
            let candidates = run(&h, &[], CalcFlags::NONE);
            prop_assert_eq!(&h, &before);
            prop_assert_eq!(candidates.len(), 1);
            for c in &candidates {
                for i in 0..c.tenpai_probs.len() {
                    prop_assert!((0.0..=1.0).contains(&c.tenpai_probs[i]));
                    prop_assert!((0.0..=1.0).contains(&c.win_probs[i]));
                    prop_assert!(c.exp_values[i] >= 0.0);
                }
            }
        }
    }
}
