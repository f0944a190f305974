//! Hand representation: a 34-slot histogram of concealed tiles, red-five
//! flags, and the list of called melds.

use std::fmt;
use std::str::FromStr;

use crate::error::CalcError;
use crate::tile::{self, TILE_KINDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeldType {
    Chi,
    Pon,
}

/// An exposed tile group. Every meld contributes exactly three tiles to the
/// logical hand size; the tiles may include red-five ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meld {
    pub meld_type: MeldType,
    pub tiles: [u8; 3],
}

impl Meld {
    /// Base kind of the lowest tile; for a pon this is the called kind.
    pub fn base(&self) -> u8 {
        self.tiles
            .iter()
            .map(|&t| tile::normalize(t))
            .min()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    /// Concealed tiles per base kind. Red fives are counted here too.
    pub counts: [u8; TILE_KINDS],
    /// Whether the concealed hand holds the red m5 / p5 / s5.
    pub akas: [bool; 3],
    pub melds: Vec<Meld>,
}

impl Default for Hand {
    fn default() -> Self {
        Hand {
            counts: [0; TILE_KINDS],
            akas: [false; 3],
            melds: Vec::new(),
        }
    }
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hand from tile ids (`0..37`, red fives allowed).
    pub fn from_tiles(tiles: &[u8], melds: Vec<Meld>) -> Result<Self, CalcError> {
        let mut hand = Hand {
            melds,
            ..Hand::default()
        };
        for &t in tiles {
            hand.add(t)?;
        }
        Ok(hand)
    }

    /// Add one tile to the concealed part.
    pub fn add(&mut self, t: u8) -> Result<(), CalcError> {
        if t as usize >= tile::COUNT_SLOTS {
            return Err(CalcError::InvalidTileCount(t));
        }
        let kind = tile::normalize(t) as usize;
        if self.counts[kind] == 4 {
            return Err(CalcError::InvalidTileCount(kind as u8));
        }
        if tile::is_red(t) {
            let idx = tile::red_index(t).unwrap_or(0);
            if self.akas[idx] {
                return Err(CalcError::InvalidTileCount(t));
            }
            self.akas[idx] = true;
        }
        self.counts[kind] += 1;
        Ok(())
    }

    /// Remove one tile from the concealed part. Removing a red id clears its
    /// flag; removing a plain five leaves the flag alone.
    pub fn remove(&mut self, t: u8) {
        let kind = tile::normalize(t) as usize;
        if self.counts[kind] > 0 {
            self.counts[kind] -= 1;
        }
        if tile::is_red(t) {
            if let Some(idx) = tile::red_index(t) {
                self.akas[idx] = false;
            }
        }
    }

    #[inline]
    pub fn num_tiles(&self, kind: u8) -> u8 {
        self.counts[kind as usize]
    }

    /// Concealed tile count.
    pub fn num_free_tiles(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }

    /// Logical hand size: concealed tiles plus three per meld.
    pub fn num_total_tiles(&self) -> usize {
        self.num_free_tiles() + self.melds.len() * 3
    }

    /// Number of mentsu the concealed part must still form.
    pub fn len_div3(&self) -> u8 {
        (self.num_free_tiles() / 3) as u8
    }

    pub fn is_menzen(&self) -> bool {
        self.melds.is_empty()
    }
}

impl FromStr for Hand {
    type Err = CalcError;

    /// Parse mpsz notation: digit runs followed by a suit letter, `0` for a
    /// red five, melds in parentheses, e.g. `"345m067p88s(111z)"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| CalcError::ParseHand {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut hand = Hand::new();
        let mut chars = s.chars().peekable();
        while let Some(&c) = chars.peek() {
            match c {
                '(' => {
                    chars.next();
                    let group: String = chars.by_ref().take_while(|&c| c != ')').collect();
                    let tiles = parse_run(&group).ok_or_else(|| err("bad meld group"))?;
                    let meld = classify_meld(&tiles).ok_or_else(|| err("not a chi or pon"))?;
                    hand.melds.push(meld);
                }
                c if c.is_ascii_digit() || "mpsz".contains(c) => {
                    let run: String = {
                        let mut run = String::new();
                        while let Some(&c) = chars.peek() {
                            if c == '(' || c == ' ' {
                                break;
                            }
                            run.push(c);
                            chars.next();
                            if "mpsz".contains(c) {
                                break;
                            }
                        }
                        run
                    };
                    let tiles = parse_run(&run).ok_or_else(|| err("bad tile run"))?;
                    for t in tiles {
                        hand.add(t).map_err(|_| err("too many copies of a tile"))?;
                    }
                }
                ' ' => {
                    chars.next();
                }
                _ => return Err(err("unexpected character")),
            }
        }
        Ok(hand)
    }
}

/// Parse one digit run with its trailing suit letter into tile ids.
fn parse_run(run: &str) -> Option<Vec<u8>> {
    let suit = run.chars().last()?;
    let offset = match suit {
        'm' => 0u8,
        'p' => 9,
        's' => 18,
        'z' => 27,
        _ => return None,
    };
    let digits = &run[..run.len() - 1];
    if digits.is_empty() {
        return None;
    }
    let mut tiles = Vec::with_capacity(digits.len());
    for d in digits.chars() {
        let v = d.to_digit(10)? as u8;
        let t = match v {
            0 if suit != 'z' => tile::red_tile((offset / 9) as usize),
            1..=9 if suit != 'z' => offset + v - 1,
            1..=7 if suit == 'z' => offset + v - 1,
            _ => return None,
        };
        tiles.push(t);
    }
    Some(tiles)
}

fn classify_meld(tiles: &[u8]) -> Option<Meld> {
    if tiles.len() != 3 {
        return None;
    }
    let mut kinds: Vec<u8> = tiles.iter().map(|&t| tile::normalize(t)).collect();
    kinds.sort_unstable();
    let tiles: [u8; 3] = [tiles[0], tiles[1], tiles[2]];
    if kinds[0] == kinds[1] && kinds[1] == kinds[2] {
        return Some(Meld {
            meld_type: MeldType::Pon,
            tiles,
        });
    }
    if kinds[2] < 27 && kinds[0] / 9 == kinds[2] / 9 && kinds[1] == kinds[0] + 1 && kinds[2] == kinds[0] + 2 {
        return Some(Meld {
            meld_type: MeldType::Chi,
            tiles,
        });
    }
    None
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut akas = self.akas;
        for (suit, letter) in ['m', 'p', 's', 'z'].into_iter().enumerate() {
            let lo = suit * 9;
            let hi = (lo + 9).min(TILE_KINDS);
            let mut run = String::new();
            for kind in lo..hi {
                for copy in 0..self.counts[kind] {
                    let is_five = kind as u8 == tile::red_base(suit.min(2)) && suit < 3;
                    if is_five && copy == 0 && akas[suit] {
                        akas[suit] = false;
                        run.push('0');
                    } else {
                        run.push(char::from_digit((kind - lo) as u32 + 1, 10).unwrap());
                    }
                }
            }
            if !run.is_empty() {
                write!(f, "{run}{letter}")?;
            }
        }
        for meld in &self.melds {
            let mut kinds: Vec<u8> = meld.tiles.to_vec();
            kinds.sort_unstable_by_key(|&t| tile::normalize(t));
            write!(f, "(")?;
            for t in kinds {
                write!(f, "{}", tile::name(t))?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
