//! UCI command parsing.

use std::time::Duration;

use sable_core::Position;
use sable_engine::GoLimits;

use crate::error::UciError;

/// Smallest and largest accepted `Hash` option, in megabytes.
pub const HASH_RANGE: (usize, usize) = (1, 65536);

/// Parameters for the `go` command.
///
/// All fields are optional; a bare `go` searches until `stop`.
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    /// White's remaining time.
    pub wtime: Option<Duration>,
    /// Black's remaining time.
    pub btime: Option<Duration>,
    /// White's increment per move.
    pub winc: Option<Duration>,
    /// Black's increment per move.
    pub binc: Option<Duration>,
    /// Moves until next time control.
    pub movestogo: Option<u32>,
    /// Search to this depth only.
    pub depth: Option<u8>,
    /// Search for exactly this duration.
    pub movetime: Option<Duration>,
    /// Search this many nodes only.
    pub nodes: Option<u64>,
    /// Search until `stop` (no time limit).
    pub infinite: bool,
    /// Accepted and otherwise ignored; the engine does not ponder.
    pub ponder: bool,
}

impl GoParams {
    /// The time and node limits, without depth.
    pub fn limits(&self) -> GoLimits {
        GoLimits {
            wtime: self.wtime,
            btime: self.btime,
            winc: self.winc,
            binc: self.binc,
            movestogo: self.movestogo,
            movetime: self.movetime,
            infinite: self.infinite,
            nodes: self.nodes,
        }
    }
}

/// An option set through `setoption`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOption {
    /// Transposition table size in megabytes.
    Hash(usize),
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `position` -- a position with the game moves already played.
    Position(Position),
    /// `go` -- start searching with given parameters.
    Go(GoParams),
    /// `setoption name <id> value <x>`.
    SetOption(UciOption),
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per UCI spec).
    Unknown(String),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&first, rest)) = tokens.split_first() else {
        return Ok(Command::Unknown(String::new()));
    };

    match first {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "position" => parse_position(rest),
        "go" => parse_go(rest),
        "setoption" => parse_setoption(rest),
        _ => Ok(Command::Unknown(first.to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves e2e4 d7d5 ...]`
/// - `position fen <fen-string> [moves e2e4 d7d5 ...]`
///
/// Game moves go through [`Position::play_uci`] so they count towards
/// repetition detection during the search.
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    let (mut pos, rest) = match tokens.first() {
        Some(&"startpos") => (Position::startpos(), &tokens[1..]),
        Some(&"fen") => {
            let fields = tokens[1..]
                .iter()
                .position(|&t| t == "moves")
                .map_or(tokens.len(), |i| i + 1);
            let given = &tokens[1..fields];
            // The move counters may be left off; anything shorter is broken.
            if !(4..=6).contains(&given.len()) {
                return Err(UciError::InvalidFen {
                    fen: given.join(" "),
                });
            }
            let mut fen = given.join(" ");
            for counter in [" 0", " 1"].iter().skip(given.len() - 4) {
                fen.push_str(counter);
            }
            (Position::from_fen(&fen)?, &tokens[fields..])
        }
        _ => return Err(UciError::MalformedPosition),
    };

    match rest.split_first() {
        None => {}
        Some((&"moves", moves)) => {
            for uci_move in moves {
                pos.play_uci(uci_move)?;
            }
        }
        Some(_) => return Err(UciError::MalformedPosition),
    }

    Ok(Command::Position(pos))
}

/// Parse the `go` command arguments.
///
/// Supports: wtime, btime, winc, binc, movestogo, depth, movetime,
/// nodes, infinite, ponder. Unknown tokens are silently skipped.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < tokens.len() {
        let value = tokens.get(i + 1).copied();
        match tokens[i] {
            "wtime" => params.wtime = Some(parse_millis(value, "wtime")?),
            "btime" => params.btime = Some(parse_millis(value, "btime")?),
            "winc" => params.winc = Some(parse_millis(value, "winc")?),
            "binc" => params.binc = Some(parse_millis(value, "binc")?),
            "movestogo" => params.movestogo = Some(parse_int(value, "movestogo")?),
            "depth" => params.depth = Some(parse_int(value, "depth")?),
            "movetime" => params.movetime = Some(parse_millis(value, "movetime")?),
            "nodes" => params.nodes = Some(parse_int(value, "nodes")?),
            "infinite" => {
                params.infinite = true;
                i += 1;
                continue;
            }
            "ponder" => {
                params.ponder = true;
                i += 1;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    Ok(Command::Go(params))
}

/// Parse `setoption name <id> value <x>`.
///
/// Option names are matched case-insensitively. Only `Hash` is known.
fn parse_setoption(tokens: &[&str]) -> Result<Command, UciError> {
    let invalid = |reason: &str| UciError::InvalidOption {
        reason: reason.to_string(),
    };

    if tokens.first() != Some(&"name") {
        return Err(invalid("expected 'name'"));
    }
    let value_at = tokens.iter().position(|&t| t == "value");
    let name = tokens[1..value_at.unwrap_or(tokens.len())].join(" ");
    let value = value_at.and_then(|i| tokens.get(i + 1)).copied();

    if name.eq_ignore_ascii_case("hash") {
        let raw = value.ok_or_else(|| invalid("Hash needs a value"))?;
        let mb: usize = raw
            .parse()
            .map_err(|_| invalid(&format!("Hash value '{raw}' is not a number")))?;
        let (min, max) = HASH_RANGE;
        if !(min..=max).contains(&mb) {
            return Err(invalid(&format!("Hash {mb} outside {min}..={max}")));
        }
        Ok(Command::SetOption(UciOption::Hash(mb)))
    } else {
        Err(invalid(&format!("unknown option '{name}'")))
    }
}

/// Parse a millisecond value from a token.
///
/// Negative clocks, which some controllers send when a flag falls, read as zero.
fn parse_millis(token: Option<&str>, param: &str) -> Result<Duration, UciError> {
    let ms: i64 = parse_int(token, param)?;
    Ok(Duration::from_millis(ms.max(0) as u64))
}

/// Parse an integer value from a token.
fn parse_int<T: std::str::FromStr>(token: Option<&str>, param: &str) -> Result<T, UciError> {
    let value = token.ok_or_else(|| UciError::MissingGoValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}
