//! Sample driver: analyze a hand and print the candidate table.
//!
//! ```text
//! nanikiru [--dora 4z,..] [--turn N] [--east|--south|--west|--north]
//!          [--shanten-down] [--tegawari] [--double-riichi] [--ippatsu]
//!          [--haitei] [--uradora] [--red-draws] [--win-prob] <hand>
//! ```
//!
//! Hands use mpsz notation with `0` for red fives and parenthesised melds,
//! e.g. `123m4067p56s22z(777z)`. Dora arguments are indicator tiles.

use std::env;
use std::process;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};

use riichi_ev::shanten::{calc_shanten, ShantenKind};
use riichi_ev::tile::{self, EAST};
use riichi_ev::{CalcFlags, ExpectedValueCalculator, Hand, ScoreCalculator};

fn parse_tile(s: &str) -> Result<u8> {
    let s = s.trim();
    let mut chars = s.chars();
    let (digit, suit) = (
        chars.next().ok_or_else(|| anyhow!("empty tile"))?,
        chars.next().ok_or_else(|| anyhow!("tile '{s}' has no suit"))?,
    );
    if chars.next().is_some() {
        bail!("tile '{s}' is malformed");
    }
    let offset = match suit {
        'm' => 0u8,
        'p' => 9,
        's' => 18,
        'z' => 27,
        _ => bail!("unknown suit in '{s}'"),
    };
    let v = digit.to_digit(10).ok_or_else(|| anyhow!("bad rank in '{s}'"))? as u8;
    Ok(match (v, suit) {
        (0, 'm') => tile::RED_MANZU5,
        (0, 'p') => tile::RED_PINZU5,
        (0, 's') => tile::RED_SOUZU5,
        (1..=9, 'm' | 'p' | 's') => offset + v - 1,
        (1..=7, 'z') => offset + v - 1,
        _ => bail!("tile '{s}' is out of range"),
    })
}

fn usage() -> ! {
    eprintln!("usage: nanikiru [options] <hand>");
    eprintln!("       e.g. nanikiru --dora 4z --uradora '123m406p2278s44z3p'");
    process::exit(2);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut flags = CalcFlags::HAITEI;
    let mut dora_indicators: Vec<u8> = Vec::new();
    let mut turn: usize = 1;
    let mut jikaze = EAST;
    let mut hand_arg: Option<String> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dora" => {
                let v = args.next().context("--dora needs a tile list")?;
                for part in v.split(',') {
                    dora_indicators.push(parse_tile(part)?);
                }
            }
            "--turn" => {
                turn = args
                    .next()
                    .context("--turn needs a number")?
                    .parse()
                    .context("--turn needs a number")?;
            }
            "--east" => jikaze = EAST,
            "--south" => jikaze = EAST + 1,
            "--west" => jikaze = EAST + 2,
            "--north" => jikaze = EAST + 3,
            "--shanten-down" => flags = flags | CalcFlags::SHANTEN_DOWN,
            "--tegawari" => flags = flags | CalcFlags::TEGAWARI,
            "--double-riichi" => flags = flags | CalcFlags::DOUBLE_RIICHI,
            "--ippatsu" => flags = flags | CalcFlags::IPPATSU,
            "--haitei" => flags = flags | CalcFlags::HAITEI,
            "--uradora" => flags = flags | CalcFlags::URADORA,
            "--red-draws" => flags = flags | CalcFlags::RED_FIVE_DRAWS,
            "--win-prob" => flags = flags | CalcFlags::MAXIMIZE_WIN_PROB,
            "--help" | "-h" => usage(),
            _ if hand_arg.is_none() => hand_arg = Some(arg),
            _ => usage(),
        }
    }
    let Some(hand_str) = hand_arg else { usage() };

    let hand: Hand = hand_str.parse()?;
    let shanten = calc_shanten(&hand, ShantenKind::Union);
    let dora_tiles: Vec<u8> = dora_indicators.iter().map(|&t| tile::next_dora(t)).collect();
    let score_calculator = ScoreCalculator::new(EAST, jikaze).with_dora(dora_tiles);
    let calculator = ExpectedValueCalculator::new(ShantenKind::Union, flags);

    let started = Instant::now();
    let candidates = calculator.calc(&hand, &score_calculator, &dora_indicators)?;
    let elapsed = started.elapsed();

    println!("hand: {hand}  shanten: {shanten}  turn: {turn}");
    let idx = turn.saturating_sub(1);
    for candidate in &candidates {
        let played = match candidate.tile {
            Some(t) => format!("discard {}", tile::name(t)),
            None => "draw".to_string(),
        };
        let kinds = candidate.required_tiles.len();
        let count = candidate.num_required_tiles;
        if candidate.tenpai_probs.is_empty() {
            println!("[{played}] useful: {kinds:>2} kinds {count:>3} tiles");
            continue;
        }
        println!(
            "[{played}] useful: {kinds:>2} kinds {count:>3} tiles, tenpai {:>6.2}%, win {:>6.2}%, EV {:>8.2}{}",
            candidate.tenpai_probs.get(idx).copied().unwrap_or(0.0) * 100.0,
            candidate.win_probs.get(idx).copied().unwrap_or(0.0) * 100.0,
            candidate.exp_values.get(idx).copied().unwrap_or(0.0),
            if candidate.shanten_down { "  (shanten back)" } else { "" },
        );
    }
    println!("elapsed: {}us", elapsed.as_micros());
    Ok(())
}
