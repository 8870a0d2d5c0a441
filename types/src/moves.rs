//! Packed move encoding used by the lobby server.
//!
//! A move is sent as a single integer. Files `a..h` map to `0..7` and ranks map
//! to `0..7` in *descending* order (rank 8 is 0, rank 1 is 7). With `p` the
//! source and `d` the destination square:
//!
//! ```text
//! base    = ((d.rank * 8 + d.file) * 8 + p.rank) * 8 + p.file     // 0..4096
//! encoded = base                                                   // plain move
//! encoded = (promotion_index + 1) * 4096 + base                    // promotion
//! ```
//!
//! where `promotion_index` is the position of the piece letter in `qnbr`.
use std::fmt;

use thiserror::Error;

/// Number of distinct `(from, to)` pairs; promotions are stacked above it.
pub const BASE_RANGE: u32 = 4096;

const FILES: [u8; 8] = *b"abcdefgh";
const RANKS: [u8; 8] = *b"87654321";
const PROMOTIONS: [u8; 4] = *b"qnbr";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("invalid square: {0:?}")]
    InvalidSquare(String),
    #[error("invalid promotion piece: {0:?}")]
    InvalidPromotion(char),
    #[error("invalid move notation: {0:?}")]
    InvalidNotation(String),
    #[error("encoded move out of range: {0}")]
    OutOfRange(u32),
}

/// A board square as column/row indices in the server's coordinate system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Builds a square from server indices; both must be in `0..8`.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Self { file, rank })
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    /// Row index, 0 for rank 8 and 7 for rank 1.
    pub fn rank(&self) -> u8 {
        self.rank
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Promotion {
    Queen,
    Knight,
    Bishop,
    Rook,
}

impl Promotion {
    pub const ALL: [Promotion; 4] = [
        Promotion::Queen,
        Promotion::Knight,
        Promotion::Bishop,
        Promotion::Rook,
    ];

    fn index(&self) -> u32 {
        match self {
            Promotion::Queen => 0,
            Promotion::Knight => 1,
            Promotion::Bishop => 2,
            Promotion::Rook => 3,
        }
    }

    fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// A move in coordinate form, as produced by a UCI engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WireMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

/// Translates between coordinate notation and the packed integer.
///
/// The lookup tables are owned by the codec rather than being process-wide so
/// that a server variant with a different alphabet only needs another codec
/// value.
#[derive(Clone, Debug)]
pub struct MoveCodec {
    files: [u8; 8],
    ranks: [u8; 8],
    promotions: [u8; 4],
}

impl Default for MoveCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveCodec {
    pub const fn new() -> Self {
        Self {
            files: FILES,
            ranks: RANKS,
            promotions: PROMOTIONS,
        }
    }

    /// Parses a square such as `e4`.
    pub fn parse_square(&self, text: &str) -> Result<Square, MoveError> {
        let bytes = text.as_bytes();
        let invalid = || MoveError::InvalidSquare(text.to_string());
        if bytes.len() != 2 {
            return Err(invalid());
        }
        let file = position(&self.files, bytes[0]).ok_or_else(invalid)?;
        let rank = position(&self.ranks, bytes[1]).ok_or_else(invalid)?;
        Ok(Square { file, rank })
    }

    pub fn parse_promotion(&self, letter: char) -> Result<Promotion, MoveError> {
        let byte = u8::try_from(letter).map_err(|_| MoveError::InvalidPromotion(letter))?;
        position(&self.promotions, byte.to_ascii_lowercase())
            .and_then(|index| Promotion::from_index(index as u32))
            .ok_or(MoveError::InvalidPromotion(letter))
    }

    /// Parses engine output such as `e2e4` or `e7e8q`.
    pub fn parse(&self, text: &str) -> Result<WireMove, MoveError> {
        let text = text.trim();
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(MoveError::InvalidNotation(text.to_string()));
        }
        let from = self.parse_square(&text[..2])?;
        let to = self.parse_square(&text[2..4])?;
        let promotion = match text[4..].chars().next() {
            Some(letter) => Some(self.parse_promotion(letter)?),
            None => None,
        };
        Ok(WireMove {
            from,
            to,
            promotion,
        })
    }

    /// Formats a move back to coordinate notation.
    pub fn format(&self, mv: &WireMove) -> String {
        let mut out = String::with_capacity(5);
        for square in [mv.from, mv.to] {
            out.push(self.files[square.file as usize] as char);
            out.push(self.ranks[square.rank as usize] as char);
        }
        if let Some(promotion) = mv.promotion {
            out.push(self.promotions[promotion.index() as usize] as char);
        }
        out
    }

    pub fn encode(&self, mv: &WireMove) -> u32 {
        let (p0, p1) = (mv.from.file as u32, mv.from.rank as u32);
        let (d0, d1) = (mv.to.file as u32, mv.to.rank as u32);
        let base = ((d1 * 8 + d0) * 8 + p1) * 8 + p0;
        match mv.promotion {
            Some(promotion) => (promotion.index() + 1) * BASE_RANGE + base,
            None => base,
        }
    }

    pub fn decode(&self, encoded: u32) -> Result<WireMove, MoveError> {
        let selector = encoded / BASE_RANGE;
        let promotion = match selector {
            0 => None,
            n => Some(Promotion::from_index(n - 1).ok_or(MoveError::OutOfRange(encoded))?),
        };
        let base = encoded % BASE_RANGE;
        let from = Square {
            file: (base % 8) as u8,
            rank: (base / 8 % 8) as u8,
        };
        let to = Square {
            file: (base / 64 % 8) as u8,
            rank: (base / 512) as u8,
        };
        Ok(WireMove {
            from,
            to,
            promotion,
        })
    }

    /// Parses engine output and packs it in one step.
    pub fn encode_str(&self, text: &str) -> Result<u32, MoveError> {
        self.parse(text).map(|mv| self.encode(&mv))
    }
}

impl fmt::Display for WireMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&MoveCodec::new().format(self))
    }
}

fn position(table: &[u8], byte: u8) -> Option<u8> {
    table.iter().position(|&b| b == byte).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_pawn_push() {
        let codec = MoveCodec::new();
        assert_eq!(codec.encode_str("e2e4").unwrap(), 2356);
    }

    #[test]
    fn test_promotion_offsets() {
        let codec = MoveCodec::new();
        let base = codec.encode_str("a7a8").unwrap();
        assert_eq!(codec.encode_str("a7a8q").unwrap(), BASE_RANGE + base);
        assert_eq!(codec.encode_str("a7a8n").unwrap(), 2 * BASE_RANGE + base);
        assert_eq!(codec.encode_str("a7a8b").unwrap(), 3 * BASE_RANGE + base);
        assert_eq!(codec.encode_str("a7a8r").unwrap(), 4 * BASE_RANGE + base);
    }

    #[test]
    fn test_every_move_survives_decode() {
        let codec = MoveCodec::new();
        let promotions = [
            None,
            Some(Promotion::Queen),
            Some(Promotion::Knight),
            Some(Promotion::Bishop),
            Some(Promotion::Rook),
        ];
        for from in 0..64u8 {
            for to in 0..64u8 {
                for promotion in promotions {
                    let mv = WireMove {
                        from: Square::new(from % 8, from / 8).unwrap(),
                        to: Square::new(to % 8, to / 8).unwrap(),
                        promotion,
                    };
                    let encoded = codec.encode(&mv);
                    assert_eq!(codec.decode(encoded).unwrap(), mv);
                    assert_eq!(codec.parse(&codec.format(&mv)).unwrap(), mv);
                }
            }
        }
    }

    #[test]
    fn test_rank_order_is_descending() {
        let codec = MoveCodec::new();
        assert_eq!(codec.parse_square("a8").unwrap(), Square::new(0, 0).unwrap());
        assert_eq!(codec.parse_square("h1").unwrap(), Square::new(7, 7).unwrap());
    }

    #[test]
    fn test_rejects_bad_input() {
        let codec = MoveCodec::new();
        assert!(matches!(codec.parse("e2"), Err(MoveError::InvalidNotation(_))));
        assert!(matches!(codec.parse("i2e4"), Err(MoveError::InvalidSquare(_))));
        assert!(matches!(codec.parse("e7e8k"), Err(MoveError::InvalidPromotion('k'))));
        assert!(matches!(
            codec.decode(5 * BASE_RANGE),
            Err(MoveError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_display_matches_engine_notation() {
        let codec = MoveCodec::new();
        let mv = codec.parse("g7g8n").unwrap();
        assert_eq!(mv.to_string(), "g7g8n");
    }
}
