//! `make_move` / `unmake_move`: apply and reverse a pseudolegal move on the
//! board, ply stack, and Zobrist key (§4.C), grounded on the original
//! engine's `position::make_move`/`unmake_move`.

use crate::bitboard::Bitboard;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceType};
use crate::square::Square;
use crate::zobrist;

use super::{Position, State, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K, CASTLE_WHITE_Q};

fn adv_dir(color: Color) -> isize {
    if color == Color::White {
        8
    } else {
        -8
    }
}

fn shift_square(sq: Square, delta: isize) -> Square {
    Square::from_index((sq.index() as isize + delta) as usize)
}

impl Position {
    /// Apply `m`, which must be pseudolegal in the current position. Returns
    /// `false` (and still leaves the move applied, matching the teacher's
    /// "caller must unmake on rejection" contract) if it leaves the mover's
    /// own king in check, i.e. `m` was pseudolegal but not legal.
    pub fn make_move(&mut self, m: Move) -> bool {
        debug_assert!(!self.is_check_for(self.color_to_move.opposite()));

        let ctm = self.color_to_move;
        let last = self.current().clone();
        let mut next = State {
            last_move: m,
            en_passant_square: Square::NULL,
            castle_rights: last.castle_rights,
            captured_piece: Piece::NULL,
            captured_square: Square::NULL,
            halfmove_clock: last.halfmove_clock + 1,
            fullmove_number: if ctm == Color::Black {
                last.fullmove_number + 1
            } else {
                last.fullmove_number
            },
            in_check: false,
            key: 0,
        };

        let src = m.src();
        let dst = m.dst();
        let src_piece = self.b.remove(src);

        if m.is_capture() {
            next.captured_piece = self.b.remove(dst);
            next.captured_square = dst;
            next.halfmove_clock = 0;
        } else if m.is_en_passant() {
            let cap_sq = shift_square(dst, -adv_dir(ctm));
            next.captured_piece = self.b.remove(cap_sq);
            next.captured_square = cap_sq;
            next.halfmove_clock = 0;
        } else if m.is_castle_kingside() {
            let (rook_src, rook_dst) = match ctm {
                Color::White => (Square::from_index(7), Square::from_index(5)),
                Color::Black => (Square::from_index(63), Square::from_index(61)),
            };
            let rook = self.b.remove(rook_src);
            self.b.place(rook_dst, rook);
        } else if m.is_castle_queenside() {
            let (rook_src, rook_dst) = match ctm {
                Color::White => (Square::from_index(0), Square::from_index(3)),
                Color::Black => (Square::from_index(56), Square::from_index(59)),
            };
            let rook = self.b.remove(rook_src);
            self.b.place(rook_dst, rook);
        }

        if src_piece.kind() == PieceType::Pawn {
            next.halfmove_clock = 0;
        }

        if let Some(promo) = m.promotion() {
            self.b.place(dst, Piece::new(ctm, promo));
        } else {
            self.b.place(dst, src_piece);
        }

        let modmask = Bitboard::from_square(src) | Bitboard::from_square(dst);
        let ks_revoke = |color: Color| -> Bitboard {
            match color {
                Color::White => Bitboard::from_square(Square::from_index(4)) | Bitboard::from_square(Square::from_index(7)),
                Color::Black => Bitboard::from_square(Square::from_index(60)) | Bitboard::from_square(Square::from_index(63)),
            }
        };
        let qs_revoke = |color: Color| -> Bitboard {
            match color {
                Color::White => Bitboard::from_square(Square::from_index(4)) | Bitboard::from_square(Square::from_index(0)),
                Color::Black => Bitboard::from_square(Square::from_index(60)) | Bitboard::from_square(Square::from_index(56)),
            }
        };

        if !(modmask & ks_revoke(Color::White)).is_empty() {
            next.castle_rights &= !CASTLE_WHITE_K;
        }
        if !(modmask & qs_revoke(Color::White)).is_empty() {
            next.castle_rights &= !CASTLE_WHITE_Q;
        }
        if !(modmask & ks_revoke(Color::Black)).is_empty() {
            next.castle_rights &= !CASTLE_BLACK_K;
        }
        if !(modmask & qs_revoke(Color::Black)).is_empty() {
            next.castle_rights &= !CASTLE_BLACK_Q;
        }

        if m.is_pawn_jump() {
            next.en_passant_square = shift_square(dst, -adv_dir(ctm));
        }

        self.color_to_move = ctm.opposite();

        next.key = self.b.key() ^ zobrist::en_passant(next.en_passant_square) ^ zobrist::castle(next.castle_rights);
        if self.color_to_move == Color::Black {
            next.key ^= zobrist::black_to_move();
        }

        self.ply.push(next);
        let in_check = self.is_check_for(self.color_to_move);
        self.ply.last_mut().unwrap().in_check = in_check;

        self.push_frame();
        self.write_frame();

        !self.is_check_for(ctm)
    }

    /// Reverse the most recent `make_move`. Panics if called on the root ply.
    pub fn unmake_move(&mut self) -> Move {
        assert!(self.ply.len() > 1, "cannot unmake the root position");

        let last_state = self.ply.pop().unwrap();
        let m = last_state.last_move;

        self.color_to_move = self.color_to_move.opposite();
        let ctm = self.color_to_move;

        let src = m.src();
        let dst = m.dst();
        let moved_piece = self.b.remove(dst);

        if m.is_capture() || m.is_en_passant() {
            self.b.place(last_state.captured_square, last_state.captured_piece);
        } else if m.is_castle_kingside() {
            let (rook_src, rook_dst) = match ctm {
                Color::White => (Square::from_index(7), Square::from_index(5)),
                Color::Black => (Square::from_index(63), Square::from_index(61)),
            };
            let rook = self.b.remove(rook_dst);
            self.b.place(rook_src, rook);
        } else if m.is_castle_queenside() {
            let (rook_src, rook_dst) = match ctm {
                Color::White => (Square::from_index(0), Square::from_index(3)),
                Color::Black => (Square::from_index(56), Square::from_index(59)),
            };
            let rook = self.b.remove(rook_dst);
            self.b.place(rook_src, rook);
        }

        if m.is_promotion() {
            self.b.place(src, Piece::new(ctm, PieceType::Pawn));
        } else {
            self.b.place(src, moved_piece);
        }

        self.pop_frame();
        self.write_frame();

        m
    }

    /// Try to match `m` (from UCI input) against the pseudolegal moves in
    /// this position and apply it. Slow — intended for UCI input and tests,
    /// not the search hot path.
    pub fn make_matched_move(&mut self, m: Move) -> Option<Move> {
        let moves = self.pseudolegal_moves();
        let matched = moves.into_iter().find(|pl| pl.uci_eq(m))?;
        self.make_move(matched);
        Some(matched)
    }

    pub(crate) fn is_check_for(&self, color: Color) -> bool {
        let king_sq = self.b.king_square(color);
        self.b.is_attacked(king_sq, color.opposite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square;

    #[test]
    fn make_unmake_restores_key_and_fen() {
        let mut pos = Position::new();
        let fen_before = pos.to_fen();
        let key_before = pos.key();
        let m = pos
            .pseudolegal_moves()
            .into_iter()
            .find(|m| m.src() == Square::new(1, 4) && m.dst() == Square::new(3, 4))
            .unwrap();
        assert!(pos.make_move(m));
        assert_ne!(pos.key(), key_before);
        pos.unmake_move();
        assert_eq!(pos.to_fen(), fen_before);
        assert_eq!(pos.key(), key_before);
    }

    #[test]
    fn pawn_jump_sets_en_passant_square() {
        let mut pos = Position::new();
        let m = pos
            .pseudolegal_moves()
            .into_iter()
            .find(|m| m.is_pawn_jump() && m.src() == Square::new(1, 4))
            .unwrap();
        pos.make_move(m);
        assert_eq!(pos.current().en_passant_square, Square::new(2, 4));
    }

    #[test]
    fn capture_resets_halfmove_clock() {
        let mut pos = Position::from_fen("4k3/8/8/4p3/3P4/8/8/4K3 w - - 5 10").unwrap();
        let m = pos
            .pseudolegal_moves()
            .into_iter()
            .find(|m| m.is_capture())
            .unwrap();
        pos.make_move(m);
        assert_eq!(pos.current().halfmove_clock, 0);
    }
}
