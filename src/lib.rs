//! Self-play chess engine core: bitboard move generation, a PUCT-style parallel
//! Monte Carlo Tree Search, and the worker pool that drives it against a
//! batched policy+value network evaluator.
//!
//! The trained network itself is not part of this crate. It is represented by
//! the [`evaluator::Evaluator`] trait; callers plug in a real model loader in
//! production and a deterministic stand-in in tests.

pub mod attacks;
pub mod bitboard;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod moves;
pub mod node;
pub mod piece;
pub mod pool;
pub mod position;
pub mod square;
pub mod train;
pub mod uci;
pub mod worker;
pub mod zobrist;

pub use bitboard::Bitboard;
pub use config::Config;
pub use error::FenError;
pub use evaluator::{EvalOutput, Evaluator, RandomEvaluator};
pub use moves::Move;
pub use node::Node;
pub use piece::{Color, Piece, PieceType};
pub use position::{Board, Position};
pub use square::Square;

/// Per-square input-tensor bit width (§3 Input tensor).
pub use position::SQUARE_BITS;
/// Dense policy size: all (from, to) square pairs.
pub const POLICY_SIZE: usize = 4096;
/// Upper bound on pseudolegal moves in any legal chess position.
pub const MAX_PL_MOVES: usize = 100;
