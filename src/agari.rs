//! Decomposition of a complete concealed hand into head + mentsu divisions.
//!
//! The yaku layer scores every division and keeps the best one; melds are
//! appended there and never appear here.

use crate::tile::TILE_KINDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mentsu {
    Koutsu(u8),
    /// Lowest tile of the run.
    Shuntsu(u8),
}

#[derive(Debug, Clone)]
pub struct Division {
    pub head: u8,
    pub body: Vec<Mentsu>,
}

/// All ways to split the concealed tiles into one pair and mentsu. Empty for
/// hands that only complete as chiitoitsu or kokushi.
pub fn find_divisions(counts: &[u8; TILE_KINDS]) -> Vec<Division> {
    let mut divisions = Vec::new();
    for head in 0..TILE_KINDS {
        if counts[head] < 2 {
            continue;
        }
        let mut rest = *counts;
        rest[head] -= 2;
        let mut body = Vec::new();
        decompose(&mut rest, 0, &mut body, &mut |body| {
            divisions.push(Division {
                head: head as u8,
                body: body.to_vec(),
            });
        });
    }
    divisions
}

fn decompose(
    counts: &mut [u8; TILE_KINDS],
    start: usize,
    body: &mut Vec<Mentsu>,
    found: &mut impl FnMut(&[Mentsu]),
) {
    let mut i = start;
    while i < TILE_KINDS && counts[i] == 0 {
        i += 1;
    }
    if i == TILE_KINDS {
        found(body);
        return;
    }

    if counts[i] >= 3 {
        counts[i] -= 3;
        body.push(Mentsu::Koutsu(i as u8));
        decompose(counts, i, body, found);
        body.pop();
        counts[i] += 3;
    }

    if i < 27 && i % 9 <= 6 && counts[i + 1] > 0 && counts[i + 2] > 0 {
        counts[i] -= 1;
        counts[i + 1] -= 1;
        counts[i + 2] -= 1;
        body.push(Mentsu::Shuntsu(i as u8));
        decompose(counts, i, body, found);
        body.pop();
        counts[i] += 1;
        counts[i + 1] += 1;
        counts[i + 2] += 1;
    }
}

pub fn is_chiitoitsu(counts: &[u8; TILE_KINDS]) -> bool {
    counts.iter().filter(|&&c| c == 2).count() == 7
}

pub fn is_kokushi(counts: &[u8; TILE_KINDS]) -> bool {
    const TERMINALS: [usize; 13] = [0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33];
    let mut kinds = 0;
    let mut has_pair = false;
    for &idx in &TERMINALS {
        if counts[idx] > 0 {
            kinds += 1;
            has_pair |= counts[idx] >= 2;
        }
    }
    let total: u8 = counts.iter().sum();
    kinds == 13 && has_pair && total == 14
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::Hand;

    fn counts(s: &str) -> [u8; TILE_KINDS] {
        s.parse::<Hand>().unwrap().counts
    }

    #[test]
    fn standard_division() {
        let divs = find_divisions(&counts("123m456m789m123p44p"));
        assert_eq!(divs.len(), 1);
        assert_eq!(divs[0].head, 12);
        assert_eq!(divs[0].body.len(), 4);
    }

    #[test]
    fn multiple_divisions() {
        // 111222333m can be read as three koutsu or three identical runs.
        let divs = find_divisions(&counts("111222333m44455p"));
        assert!(divs.len() >= 2);
    }

    #[test]
    fn incomplete_hand_has_no_division() {
        assert!(find_divisions(&counts("123m456m789m124p4p")).is_empty());
    }

    #[test]
    fn special_forms() {
        assert!(is_chiitoitsu(&counts("1199m3377p55s1177z")));
        assert!(!is_chiitoitsu(&counts("1199m3377p555s177z")));
        assert!(is_kokushi(&counts("19m19p19s12345677z")));
        assert!(!is_kokushi(&counts("19m19p19s1234566z")));
    }
}
