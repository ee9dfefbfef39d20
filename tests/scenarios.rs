//! Scenario tests against the testable properties in SPEC_FULL.md §8:
//! repetition draws, mate-in-one search results, and the tree-publication
//! race guarantee under concurrent workers.

use std::sync::Arc;

use mcts_engine::evaluator::{EvalOutput, Evaluator};
use mcts_engine::pool::Pool;
use mcts_engine::{Move, Position, POLICY_SIZE};

#[test]
fn repeated_knight_shuffle_is_a_threefold_draw() {
    let mut pos = Position::new();
    let moves = ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"];
    for uci in moves {
        let m = Move::from_uci(uci).unwrap();
        assert!(pos.make_matched_move(m).is_some(), "move {uci} should be legal");
    }
    assert_eq!(pos.num_repetitions(), 3);
    assert!(pos.is_draw());
    assert_eq!(pos.is_game_over(), Some(0));
}

/// A uniform-policy, zero-value evaluator, same as [`mcts_engine::evaluator
/// ::RandomEvaluator`] but defined locally so this test doesn't depend on a
/// crate-internal stand-in. Mate-in-one is found through exhaustive terminal
/// discovery during search, not through any evaluator bias.
struct MatingEvaluator;

impl Evaluator for MatingEvaluator {
    fn evaluate(&self, _board_input: &[f32], lmm_input: &[f32], batch_size: usize) -> Vec<EvalOutput> {
        (0..batch_size)
            .map(|row| {
                let mask = &lmm_input[row * POLICY_SIZE..(row + 1) * POLICY_SIZE];
                let legal_count = mask.iter().filter(|&&v| v > 0.0).count().max(1) as f32;
                let mut policy = Box::new([0.0f32; POLICY_SIZE]);
                for (dst, &m) in policy.iter_mut().zip(mask.iter()) {
                    if m > 0.0 {
                        *dst = 1.0 / legal_count;
                    }
                }
                EvalOutput { policy, value: 0.0 }
            })
            .collect()
    }
}

#[test]
fn search_from_mate_in_one_returns_a1a8() {
    // Rook-ladder mate-in-one for white: Ra1-a8#. A generous time budget
    // gives the forced-mate child's visit count a dominant enough share of
    // the root's weighted sample that the test is reliable in practice,
    // even though `search`'s bestmove is a visit-weighted sample rather
    // than a strict argmax (§4.G) and so is not 100% deterministic.
    let pos = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
    let mut pool = Pool::init(Arc::new(MatingEvaluator), 1, 4);
    let mv = pool.search(&pos, 2000, |_| {});
    assert!(mv.uci_eq(Move::from_uci("a1a8").unwrap()), "expected the mating move a1a8, got {mv:?}");
}

#[test]
fn two_workers_never_publish_two_child_lists_for_one_node() {
    // set_children's one-shot guarantee (testable property #10) is exercised
    // directly at the node level elsewhere; here a multi-threaded search
    // with more than one worker must still converge on a single consistent
    // child count per expanded node without panicking or racing.
    let pos = Position::new();
    let mut pool = Pool::init(Arc::new(MatingEvaluator), 4, 8);
    let mv = pool.search(&pos, 300, |_| {});
    assert!(!mv.is_null());
    let legal = pos.legal_moves();
    assert!(legal.iter().any(|m| m.uci_eq(mv)));
}
