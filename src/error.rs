//! Error types for position construction and UCI command parsing.

use std::fmt;

/// Error type for FEN parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has the wrong number of whitespace-separated fields.
    WrongFieldCount { found: usize },
    /// Invalid piece character in the piece-placement field.
    InvalidPiece { char: char },
    /// A rank in the piece-placement field did not sum to 8 files.
    BadRank { rank: usize, files: usize },
    /// The piece-placement field had a rank count other than 8.
    BadRankCount { found: usize },
    /// Invalid side-to-move field (must be "w" or "b").
    InvalidSideToMove { found: String },
    /// Invalid castling-rights character.
    InvalidCastling { char: char },
    /// Invalid en-passant target square.
    InvalidEnPassant { found: String },
    /// Halfmove clock or fullmove number field was not a valid integer.
    InvalidCounter { found: String },
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::WrongFieldCount { found } => {
                write!(f, "FEN must have 6 fields, found {found}")
            }
            FenError::InvalidPiece { char } => write!(f, "invalid piece character '{char}' in FEN"),
            FenError::BadRank { rank, files } => {
                write!(f, "rank {rank} has {files} files, expected 8")
            }
            FenError::BadRankCount { found } => {
                write!(f, "piece placement has {found} ranks, expected 8")
            }
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidCastling { char } => write!(f, "invalid castling character '{char}'"),
            FenError::InvalidEnPassant { found } => write!(f, "invalid en passant square '{found}'"),
            FenError::InvalidCounter { found } => write!(f, "invalid counter field '{found}'"),
        }
    }
}

impl std::error::Error for FenError {}

/// Error type for UCI move-notation parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move string is not 4-5 characters.
    InvalidLength { len: usize },
    /// Invalid square notation.
    InvalidSquare { notation: String },
    /// Invalid promotion piece character.
    InvalidPromotion { char: char },
    /// The move does not match any pseudolegal move in the position.
    NoMatch { notation: String },
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::InvalidLength { len } => {
                write!(f, "move must be 4-5 characters, found {len}")
            }
            MoveParseError::InvalidSquare { notation } => {
                write!(f, "invalid square notation '{notation}'")
            }
            MoveParseError::InvalidPromotion { char } => {
                write!(f, "invalid promotion piece '{char}'")
            }
            MoveParseError::NoMatch { notation } => {
                write!(f, "'{notation}' does not match any pseudolegal move")
            }
        }
    }
}

impl std::error::Error for MoveParseError {}
