//! Perft leaf counting over [`Position`] play/undo.
//!
//! Walks the full legal move tree through the same guarded play/undo path
//! the search uses, so a mismatch here means an unbalanced or inexact undo.

use crate::position::Position;

/// Count leaf nodes at `depth`.
///
/// Depth 0 counts the current position. At depth 1 the legal moves are
/// counted without being played.
pub fn perft(position: &mut Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = position.generate_moves(false);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0u64;
    for mv in moves {
        let mut child = position.play_guarded(mv);
        nodes += perft(&mut child, depth - 1);
    }
    nodes
}

/// Per-move perft breakdown, sorted by move text.
pub fn divide(position: &mut Position, depth: usize) -> Vec<(String, u64)> {
    let moves = position.generate_moves(false);
    let mut results: Vec<(String, u64)> = moves
        .into_iter()
        .map(|mv| {
            let text = position.format_uci(mv);
            let mut child = position.play_guarded(mv);
            let count = if depth <= 1 { 1 } else { perft(&mut child, depth - 1) };
            (text, count)
        })
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kiwipete() -> Position {
        Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap()
    }

    #[test]
    fn startpos_depth_1_to_3() {
        let mut p = Position::startpos();
        assert_eq!(perft(&mut p, 1), 20);
        assert_eq!(perft(&mut p, 2), 400);
        assert_eq!(perft(&mut p, 3), 8_902);
        assert_eq!(p.undo_depth(), 0);
    }

    #[test]
    fn kiwipete_depth_1_and_2() {
        let mut p = kiwipete();
        let before = p.hash();
        assert_eq!(perft(&mut p, 1), 48);
        assert_eq!(perft(&mut p, 2), 2_039);
        assert_eq!(p.hash(), before);
    }

    #[test]
    #[ignore] // slow in debug builds
    fn kiwipete_depth_3() {
        assert_eq!(perft(&mut kiwipete(), 3), 97_862);
    }

    #[test]
    fn divide_sums_to_perft() {
        let mut p = Position::startpos();
        let parts = divide(&mut p, 2);
        assert_eq!(parts.len(), 20);
        assert_eq!(parts.iter().map(|(_, n)| n).sum::<u64>(), 400);
        assert!(parts.iter().any(|(m, n)| m == "e2e4" && *n == 20));
    }

    #[test]
    fn divide_prints_castling_as_king_move() {
        let mut p = kiwipete();
        let parts = divide(&mut p, 1);
        assert!(parts.iter().any(|(m, _)| m == "e1g1"));
        assert!(parts.iter().any(|(m, _)| m == "e1c1"));
    }
}
