//! Drive the protocol loop end to end over in-memory streams.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use sable_core::Position;
use sable_uci::UciEngine;

/// Output sink the test can read after the engine is done with it.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn session(script: &str) -> Vec<String> {
    let out = Captured::default();
    UciEngine::new()
        .run_with(Cursor::new(script.to_string()), out.clone())
        .unwrap();
    let bytes = out.0.lock().unwrap().clone();
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn bestmove(lines: &[String]) -> &str {
    let last = lines.last().expect("no output");
    last.strip_prefix("bestmove ").expect("last line is not bestmove")
}

#[test]
fn handshake() {
    let lines = session("uci\nisready\nquit\n");
    assert!(lines[0].starts_with("id name sable"));
    assert!(lines.iter().any(|l| l.starts_with("option name Hash type spin default 16")));
    let uciok = lines.iter().position(|l| l == "uciok").unwrap();
    assert_eq!(lines[uciok + 1], "readyok");
}

#[test]
fn depth_limited_search_reports_and_moves() {
    let lines = session("position startpos moves e2e4\ngo depth 3\n");
    let infos: Vec<_> = lines.iter().filter(|l| l.starts_with("info depth")).collect();
    assert!(!infos.is_empty());
    assert!(infos.len() <= 3);
    for info in &infos {
        for field in ["seldepth", "score", "nodes", "nps", "time", "hashfull", "pv"] {
            assert!(info.contains(field), "{field} missing from {info}");
        }
    }

    let mut pos = Position::startpos();
    pos.play_uci("e2e4").unwrap();
    assert!(pos.parse_uci(bestmove(&lines)).is_ok());
}

#[test]
fn mate_is_reported_in_moves() {
    let lines = session(
        "position fen r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4\n\
         go depth 3\n",
    );
    assert!(lines.iter().any(|l| l.contains("score mate 1")));
    assert_eq!(bestmove(&lines), "h5f7");
}

#[test]
fn no_legal_move_answers_null_move() {
    let lines = session("position fen k7/2K5/1Q6/8/8/8/8/8 b - - 0 1\ngo depth 2\n");
    assert_eq!(bestmove(&lines), "0000");
}

#[test]
fn stop_ends_infinite_search() {
    let lines = session("ucinewgame\nposition startpos\ngo infinite\nstop\nquit\n");
    assert!(Position::startpos().parse_uci(bestmove(&lines)).is_ok());
    assert_eq!(lines.iter().filter(|l| l.starts_with("bestmove")).count(), 1);
}

#[test]
fn bad_commands_are_skipped() {
    let lines = session(
        "position startpos moves e2e5\nsetoption name Hash value 2\ngo wtime\nfoo\nisready\n",
    );
    assert_eq!(lines, ["readyok"]);
}
