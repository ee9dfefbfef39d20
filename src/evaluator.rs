//! The `Evaluator` trait (§4.H): the boundary between this crate's search
//! and a trained policy/value network, which is not itself part of this
//! crate.

use crate::POLICY_SIZE;

/// One batch row's network output: a dense policy over all 4096 (from, to)
/// square pairs and a scalar value in `[-1, 1]` from the to-move side's POV.
#[derive(Clone, Debug)]
pub struct EvalOutput {
    pub policy: Box<[f32; POLICY_SIZE]>,
    pub value: f32,
}

/// A batched policy+value model. `board_input` is `batch_size * 8 * 8 *
/// SQUARE_BITS` floats (each row a POV tensor, §3), `lmm_input` is
/// `batch_size * 4096` legal-move-mask floats; implementations may use the
/// mask to renormalize or may ignore it. Workers may call `evaluate`
/// concurrently from multiple threads; an implementation owns whatever
/// internal serialization (a mutex around a model handle, a batching queue
/// on a device thread, …) that requires.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, board_input: &[f32], lmm_input: &[f32], batch_size: usize) -> Vec<EvalOutput>;
}

/// A uniform-policy, zero-value stand-in. Useful as a smoke test for the
/// search machinery without a trained model: every move looks equally
/// good, so visit counts reduce to breadth-first exploration.
#[derive(Default)]
pub struct RandomEvaluator;

impl Evaluator for RandomEvaluator {
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
