//! Tile-kind constants and helpers.
//!
//! Tiles are plain `u8` ids. `0..34` are the base kinds (1m..9m, 1p..9p,
//! 1s..9s, then the seven honors), `34..37` are the red fives of m/p/s.
//! Counting and shanten logic always works on base kinds; red fives only
//! matter for dora accounting and draw/discard bookkeeping.

/// Number of base tile kinds.
pub const TILE_KINDS: usize = 34;

/// Number of slots in a remaining-counts vector (base kinds + red fives).
pub const COUNT_SLOTS: usize = 37;

pub const MANZU5: u8 = 4;
pub const PINZU5: u8 = 13;
pub const SOUZU5: u8 = 22;

pub const EAST: u8 = 27;
pub const SOUTH: u8 = 28;
pub const WEST: u8 = 29;
pub const NORTH: u8 = 30;
pub const HAKU: u8 = 31;
pub const HATSU: u8 = 32;
pub const CHUN: u8 = 33;

pub const RED_MANZU5: u8 = 34;
pub const RED_PINZU5: u8 = 35;
pub const RED_SOUZU5: u8 = 36;

/// Fixed preference used to break ties between discards whose curves are
/// numerically equal: honors and terminals go first, middle tiles are kept,
/// red fives are discarded last of all.
#[rustfmt::skip]
pub const DISCARD_PRIORITIES: [u8; COUNT_SLOTS] = [
    5, 4, 3, 2, 1, 2, 3, 4, 5, // manzu
    5, 4, 3, 2, 1, 2, 3, 4, 5, // pinzu
    5, 4, 3, 2, 1, 2, 3, 4, 5, // souzu
    5, 5, 5, 5, 5, 5, 5,       // honors
    0, 0, 0,                   // red fives
];

/// Whether `tile` is one of the red-five ids.
#[inline]
pub fn is_red(tile: u8) -> bool {
    tile >= RED_MANZU5 && tile < COUNT_SLOTS as u8
}

/// Map a red five to its base kind; base kinds pass through.
#[inline]
pub fn normalize(tile: u8) -> u8 {
    match tile {
        RED_MANZU5 => MANZU5,
        RED_PINZU5 => PINZU5,
        RED_SOUZU5 => SOUZU5,
        t => t,
    }
}

/// Index 0..3 of a red-capable five (m5, p5, s5).
#[inline]
pub fn red_index(tile: u8) -> Option<usize> {
    match normalize(tile) {
        MANZU5 => Some(0),
        PINZU5 => Some(1),
        SOUZU5 => Some(2),
        _ => None,
    }
}

/// The red id carried by red-five slot `index`.
#[inline]
pub fn red_tile(index: usize) -> u8 {
    RED_MANZU5 + index as u8
}

/// The base five kind tracked by red-five slot `index`.
#[inline]
pub fn red_base(index: usize) -> u8 {
    [MANZU5, PINZU5, SOUZU5][index]
}

#[inline]
pub fn is_honor(tile: u8) -> bool {
    (EAST..COUNT_SLOTS as u8 - 3).contains(&tile)
}

#[inline]
pub fn is_number_terminal(tile: u8) -> bool {
    tile < EAST && (tile % 9 == 0 || tile % 9 == 8)
}

/// Terminal or honor.
#[inline]
pub fn is_yaochuu(tile: u8) -> bool {
    is_honor(tile) || is_number_terminal(tile)
}

/// The dora named by an indicator tile: next in suit (wrapping 9 -> 1),
/// next wind (wrapping N -> E), next dragon (wrapping Chun -> Haku).
#[inline]
pub fn next_dora(indicator: u8) -> u8 {
    let indicator = normalize(indicator);
    if indicator < EAST {
        let suit = indicator / 9;
        suit * 9 + (indicator % 9 + 1) % 9
    } else if indicator <= NORTH {
        EAST + (indicator - EAST + 1) % 4
    } else {
        HAKU + (indicator - HAKU + 1) % 3
    }
}

/// Inverse of [`next_dora`]: the indicator whose dora is `tile`.
#[inline]
pub fn indicator_of(tile: u8) -> u8 {
    let tile = normalize(tile);
    if tile < EAST {
        let suit = tile / 9;
        suit * 9 + (tile % 9 + 8) % 9
    } else if tile <= NORTH {
        EAST + (tile - EAST + 3) % 4
    } else {
        HAKU + (tile - HAKU + 2) % 3
    }
}

/// Render a tile id in mpsz notation (`5m`, `0p` for the red five, `7z`).
pub fn name(tile: u8) -> String {
    if is_red(tile) {
        return format!("0{}", ['m', 'p', 's'][(tile - RED_MANZU5) as usize]);
    }
    let (suit, rank) = (tile / 9, tile % 9);
    match suit {
        0 => format!("{}m", rank + 1),
        1 => format!("{}p", rank + 1),
        2 => format!("{}s", rank + 1),
        _ => format!("{}z", tile - EAST + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dora_wraps_within_groups() {
        assert_eq!(next_dora(0), 1);
        assert_eq!(next_dora(8), 0);
        assert_eq!(next_dora(17), 9);
        assert_eq!(next_dora(NORTH), EAST);
        assert_eq!(next_dora(CHUN), HAKU);
        assert_eq!(next_dora(RED_PINZU5), 14);
    }

    #[test]
    fn indicator_inverts_dora() {
        for tile in 0..TILE_KINDS as u8 {
            assert_eq!(next_dora(indicator_of(tile)), tile);
            assert_eq!(indicator_of(next_dora(tile)), tile);
        }
    }

    #[test]
    fn names() {
        assert_eq!(name(0), "1m");
        assert_eq!(name(MANZU5), "5m");
        assert_eq!(name(RED_SOUZU5), "0s");
        assert_eq!(name(CHUN), "7z");
    }
}
