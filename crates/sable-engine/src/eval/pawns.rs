//! Pawn-structure terms.

use sable_core::{Board, Color, File, Piece};

use crate::eval::score::{S, Score};

/// Charged per pawn beyond the first on a file.
pub const DOUBLED_PAWN: Score = S(-15, -15);

/// Doubled-pawn penalty for `color`.
pub fn doubled_pawns(board: &Board, color: Color) -> Score {
    let pawns = board.colored_pieces(color, Piece::Pawn);
    let mut extra = 0i16;
    for file in File::ALL {
        let on_file = (pawns & file.bitboard()).len() as i16;
        extra += (on_file - 1).max(0);
    }
    DOUBLED_PAWN * extra
}

#[cfg(test)]
mod tests {
    use sable_core::{Color, Position};

    use super::{DOUBLED_PAWN, doubled_pawns};
    use crate::eval::score::Score;

    fn doubled(fen: &str, color: Color) -> Score {
        doubled_pawns(Position::from_fen(fen).unwrap().board(), color)
    }

    #[test]
    fn clean_structure_is_free() {
        assert_eq!(
            doubled(Position::startpos().to_string().as_str(), Color::White),
            Score::ZERO
        );
    }

    #[test]
    fn each_extra_pawn_is_charged() {
        // White: two on c-file, three on f-file -> three extra.
        let fen = "4k3/8/8/5P2/2P2P2/2P5/5P2/4K3 w - - 0 1";
        assert_eq!(doubled(fen, Color::White), DOUBLED_PAWN * 3);
        assert_eq!(doubled(fen, Color::Black), Score::ZERO);
    }
}
