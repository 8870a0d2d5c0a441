use shakmaty::{
    fen::Fen,
    san::{San, SanPlus},
    Chess, EnPassantMode, Position,
};

use crate::{Error, Result};

/// Position of the current game plus the moves that led to it.
#[derive(Clone, Debug, Default)]
pub struct Board {
    position: Chess,
    moves: Vec<SanPlus>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a move in standard algebraic notation, as relayed by the lobby.
    pub fn play_san(&mut self, text: &str) -> Result<()> {
        let illegal = |reason: String| Error::IllegalMove {
            san: text.to_string(),
            reason,
        };
        let san: San = normalize_castling(text.trim())
            .parse::<SanPlus>()
            .map_err(|e| illegal(e.to_string()))?
            .san;
        let mv = san
            .to_move(&self.position)
            .map_err(|e| illegal(e.to_string()))?;
        let played = SanPlus::from_move_and_play_unchecked(&mut self.position, &mv);
        self.moves.push(played);
        Ok(())
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Movetext of the game so far, e.g. `1. e4 e5 2. Nf3`.
    pub fn movetext(&self) -> String {
        let mut out = String::new();
        for (ply, san) in self.moves.iter().enumerate() {
            if ply % 2 == 0 {
                if ply > 0 {
                    out.push(' ');
                }
                out.push_str(&format!("{}. ", ply / 2 + 1));
            } else {
                out.push(' ');
            }
            out.push_str(&san.to_string());
        }
        out
    }

    /// Number of half-moves played.
    pub fn ply(&self) -> usize {
        self.moves.len()
    }
}

fn normalize_castling(text: &str) -> String {
    match text.strip_prefix("0-0") {
        Some(rest) => format!("O-O{}", rest.replace('0', "O")),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_starting_position() {
        let board = Board::new();
        assert_eq!(board.fen(), START);
        assert_eq!(board.ply(), 0);
        assert_eq!(board.movetext(), "");
    }

    #[test]
    fn test_play_and_export() {
        let mut board = Board::new();
        for san in ["e4", "e5", "Nf3", "Nc6", "Bb5"] {
            board.play_san(san).unwrap();
        }
        assert_eq!(board.ply(), 5);
        assert_eq!(board.movetext(), "1. e4 e5 2. Nf3 Nc6 3. Bb5");
        assert_eq!(
            board.fen(),
            "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3"
        );
    }

    #[test]
    fn test_check_suffix_is_accepted() {
        let mut board = Board::new();
        for san in ["e4", "f5", "Qh5+"] {
            board.play_san(san).unwrap();
        }
        assert_eq!(board.movetext(), "1. e4 f5 2. Qh5+");
    }

    #[test]
    fn test_castling_with_zeros() {
        let mut board = Board::new();
        for san in ["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "0-0"] {
            board.play_san(san).unwrap();
        }
        assert!(board.movetext().ends_with("4. O-O"));
    }

    #[test]
    fn test_illegal_move_rejected() {
        let mut board = Board::new();
        let err = board.play_san("e5").unwrap_err();
        assert!(matches!(err, Error::IllegalMove { ref san, .. } if san == "e5"));
        let err = board.play_san("zz").unwrap_err();
        assert!(matches!(err, Error::IllegalMove { .. }));
        assert_eq!(board.ply(), 0);
    }
}
