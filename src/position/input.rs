//! POV-relative input tensor maintenance (§3 Input tensor, §4.F), grounded
//! on the original engine's `position::_write_frame` / `_push_frame` /
//! `_pop_frame`.
//!
//! Each side's tensor is a flat `8*8*85` float buffer: per square, a 15-bit
//! header (9 bits of fullmove number, 6 of halfmove clock) followed by five
//! 14-bit history frames (12 one-hot piece bits + 2 repetition-count bits),
//! frame 0 being the current position and frames 1-4 a rolling window of
//! the preceding four. Squares are reindexed through [`Square::flip`] for
//! black's point of view so the same relative geometry (second rank is
//! always "my pawns", eighth is always "their back rank") holds for both
//! sides.

use crate::piece::Color;
use crate::square::Square;

use super::{Position, FRAME_BITS, HEADER_BITS, SQUARE_BITS};

impl Position {
    /// The flat `8*8*85` input tensor for `pov`'s point of view.
    #[inline]
    #[must_use]
    pub fn input_tensor(&self, pov: Color) -> &[f32] {
        &self.input[pov.index()]
    }

    fn header(&self) -> [f32; HEADER_BITS] {
        let state = self.current();
        let mut header = [0f32; HEADER_BITS];
        for (i, slot) in header.iter_mut().take(9).enumerate() {
            *slot = ((state.fullmove_number >> i) & 1) as f32;
        }
        for i in 0..6 {
            header[9 + i] = ((state.halfmove_clock >> i) & 1) as f32;
        }
        header
    }

    /// Rewrite frame 0 and the header of every square, for both POVs, from
    /// the current board/ply state. Called after every make/unmake once the
    /// ply stack and board reflect the new position.
    pub(crate) fn write_frame(&mut self) {
        let reps = self.num_repetitions() as i64 - 1;
        let rb1 = (reps & 1) as f32;
        let rb2 = (reps >> 1) as f32;
        let header = self.header();

        for sq_idx in 0..64 {
            let sq = Square::from_index(sq_idx);
            let piece = self.b.piece_at(sq);
            for &pov in &[Color::White, Color::Black] {
                let pov_sq = if pov == Color::White { sq } else { sq.flip() };
                let offset = pov_sq.index() * SQUARE_BITS;
                let buf = &mut self.input[pov.index()];
                buf[offset..offset + HEADER_BITS].copy_from_slice(&header);
                let frame0 = offset + HEADER_BITS;
                if !piece.is_null() {
                    let bit = piece.kind().index() + if piece.color() == pov { 0 } else { 6 };
                    buf[frame0 + bit] = 1.0;
                }
                buf[frame0 + 12] = rb1;
                buf[frame0 + 13] = rb2;
            }
        }
    }

    /// Shift frames 0-3 into slots 1-4, stashing the displaced frame 4 so
    /// [`Position::pop_frame`] can restore it exactly on unmake. Must run
    /// before `write_frame` writes the new frame 0.
    pub(crate) fn push_frame(&mut self) {
        let mut saved = [[[0f32; FRAME_BITS]; 2]; 64];
        for sq_idx in 0..64 {
            let sq = Square::from_index(sq_idx);
            for &pov in &[Color::White, Color::Black] {
                let pov_sq = if pov == Color::White { sq } else { sq.flip() };
                let offset = pov_sq.index() * SQUARE_BITS;
                let buf = &mut self.input[pov.index()];
                let oldest = offset + HEADER_BITS + 4 * FRAME_BITS;
                saved[sq_idx][pov.index()].copy_from_slice(&buf[oldest..oldest + FRAME_BITS]);
                buf.copy_within(
                    offset + HEADER_BITS..offset + HEADER_BITS + 4 * FRAME_BITS,
                    offset + HEADER_BITS + FRAME_BITS,
                );
                for v in &mut buf[offset + HEADER_BITS..offset + HEADER_BITS + FRAME_BITS] {
                    *v = 0.0;
                }
            }
        }
        self.hist_frames.push(saved);
    }

    /// Reverse of [`Position::push_frame`]: shift frames 1-4 back into 0-3
    /// and restore the frame 4 stashed by the matching push, then rewrite
    /// the header for the (now-restored) current ply.
    pub(crate) fn pop_frame(&mut self) {
        let saved = self
            .hist_frames
            .pop()
            .expect("pop_frame without a matching push_frame");
        let header = self.header();

        for sq_idx in 0..64 {
            let sq = Square::from_index(sq_idx);
            for &pov in &[Color::White, Color::Black] {
                let pov_sq = if pov == Color::White { sq } else { sq.flip() };
                let offset = pov_sq.index() * SQUARE_BITS;
                let buf = &mut self.input[pov.index()];
                buf.copy_within(
                    offset + HEADER_BITS + FRAME_BITS..offset + HEADER_BITS + 5 * FRAME_BITS,
                    offset + HEADER_BITS,
                );
                let oldest = offset + HEADER_BITS + 4 * FRAME_BITS;
                buf[oldest..oldest + FRAME_BITS].copy_from_slice(&saved[sq_idx][pov.index()]);
                buf[offset..offset + HEADER_BITS].copy_from_slice(&header);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square;

    #[test]
    fn tensor_has_expected_length() {
        let pos = Position::new();
        assert_eq!(pos.input_tensor(Color::White).len(), 64 * SQUARE_BITS);
    }

    #[test]
    fn white_king_square_has_king_bit_set_in_own_pov() {
        let pos = Position::new();
        let e1 = Square::new(0, 4);
        let offset = e1.index() * SQUARE_BITS;
        let tensor = pos.input_tensor(Color::White);
        assert_eq!(tensor[offset + HEADER_BITS + 5], 1.0);
    }

    #[test]
    fn black_pov_mirrors_squares() {
        let pos = Position::new();
        let e1 = Square::new(0, 4);
        let mirrored = e1.flip();
        let offset = mirrored.index() * SQUARE_BITS;
        let tensor = pos.input_tensor(Color::Black);
        // White's king, seen from black's POV, is an opponent piece: bit 5 + 6.
        assert_eq!(tensor[offset + HEADER_BITS + 11], 1.0);
    }

    #[test]
    fn make_unmake_restores_tensor_exactly() {
        let mut pos = Position::new();
        let before = pos.input_tensor(Color::White).to_vec();
        let m = pos
            .pseudolegal_moves()
            .into_iter()
            .find(|m| m.src() == Square::new(1, 4) && m.dst() == Square::new(3, 4))
            .unwrap();
        pos.make_move(m);
        assert_ne!(pos.input_tensor(Color::White).to_vec(), before);
        pos.unmake_move();
        assert_eq!(pos.input_tensor(Color::White).to_vec(), before);
    }
}
