//! Square type and algebraic-notation helpers.

use std::fmt;

use crate::error::FenError;

/// A square on the chess board, stored as a compact 0-63 index.
///
/// Index layout: `rank * 8 + file`, so a1 = 0, b1 = 1, ..., h8 = 63.
/// [`Square::NULL`] is a distinguishable sentinel used where "no square"
/// is a valid value (e.g. a position with no en-passant target).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Square(u8);

impl Square {
    /// Sentinel for "no square".
    pub const NULL: Square = Square(64);

    /// Construct a square from a 0-63 index. Does not range-check.
    #[inline]
    #[must_use]
    pub const fn from_index(idx: usize) -> Self {
        Square(idx as u8)
    }

    /// Construct a square from rank and file (both 0-7).
    #[inline]
    #[must_use]
    pub const fn new(rank: usize, file: usize) -> Self {
        Square((rank * 8 + file) as u8)
    }

    /// The square's 0-63 index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// File, 0-7, where 0 = file a.
    #[inline]
    #[must_use]
    pub const fn file(self) -> usize {
        (self.0 & 7) as usize
    }

    /// Rank, 0-7, where 0 = rank 1.
    #[inline]
    #[must_use]
    pub const fn rank(self) -> usize {
        (self.0 >> 3) as usize
    }

    /// True if this is the [`Square::NULL`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == Square::NULL.0
    }

    /// The square rotated 180° (a1 <-> h8, e4 <-> d5), used to reindex a
    /// square from white's POV into black's POV for tensor/policy encoding.
    #[inline]
    #[must_use]
    pub const fn flip(self) -> Self {
        Square::new(7 - self.rank(), 7 - self.file())
    }

    /// Parse algebraic notation such as "e4". Returns `None` on malformed input.
    #[must_use]
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0];
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return None;
        }
        Some(Square::new((rank - b'1') as usize, (file - b'a') as usize))
    }

    /// Parse a FEN en-passant field ("-" or a square like "e3").
    pub fn from_fen_ep(s: &str) -> Result<Self, FenError> {
        if s == "-" {
            return Ok(Square::NULL);
        }
        Square::from_algebraic(s).ok_or_else(|| FenError::InvalidEnPassant {
            found: s.to_string(),
        })
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "-");
        }
        write!(
            f,
            "{}{}",
            (b'a' + self.file() as u8) as char,
            self.rank() + 1
        )
    }
}
