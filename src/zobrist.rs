//! Zobrist hashing (§4.B). Random 64-bit keys are generated once, from a
//! fixed seed, so that hashes are reproducible across runs and machines.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::piece::Piece;
use crate::square::Square;

const SEED: u64 = 0x5EED_C0FF_EE15_A5A5;

struct ZobristKeys {
    /// `piece_keys[piece.index()][square.index()]`
    piece_keys: [[u64; 64]; 12],
    castle_keys: [u64; 16],
    /// `en_passant_keys[file]`; null-ep contributes 0.
    en_passant_keys: [u64; 8],
    black_to_move_key: u64,
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut piece_keys = [[0u64; 64]; 12];
        for piece in &mut piece_keys {
            for key in piece.iter_mut() {
                *key = rng.gen();
            }
        }
        let mut castle_keys = [0u64; 16];
        for key in &mut castle_keys {
            *key = rng.gen();
        }
        let mut en_passant_keys = [0u64; 8];
        for key in &mut en_passant_keys {
            *key = rng.gen();
        }
        ZobristKeys {
            piece_keys,
            castle_keys,
            en_passant_keys,
            black_to_move_key: rng.gen(),
        }
    }
}

static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

/// Key contribution of `piece` standing on `sq`.
#[must_use]
pub fn piece(sq: Square, piece: Piece) -> u64 {
    debug_assert!(!piece.is_null());
    ZOBRIST.piece_keys[piece.index()][sq.index()]
}

/// Key contribution of a 4-bit castling-rights mask.
#[must_use]
pub fn castle(mask: u8) -> u64 {
    ZOBRIST.castle_keys[(mask & 0xF) as usize]
}

/// Key contribution of the en-passant file, or 0 if there is no ep target.
#[must_use]
pub fn en_passant(sq: Square) -> u64 {
    if sq.is_null() {
        0
    } else {
        ZOBRIST.en_passant_keys[sq.file()]
    }
}

/// Key contribution when it is black's move.
#[must_use]
pub fn black_to_move() -> u64 {
    ZOBRIST.black_to_move_key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{Color, PieceType};

    #[test]
    fn distinct_squares_and_pieces_differ() {
        let a = piece(Square::from_index(0), Piece::new(Color::White, PieceType::Pawn));
        let b = piece(Square::from_index(1), Piece::new(Color::White, PieceType::Pawn));
        let c = piece(Square::from_index(0), Piece::new(Color::Black, PieceType::Pawn));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn null_ep_contributes_zero() {
        assert_eq!(en_passant(Square::NULL), 0);
    }

    #[test]
    fn deterministic_across_calls() {
        let k1 = piece(Square::from_index(4), Piece::new(Color::Black, PieceType::King));
        let k2 = piece(Square::from_index(4), Piece::new(Color::Black, PieceType::King));
        assert_eq!(k1, k2);
    }
}
