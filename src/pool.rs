//! The worker pool / search controller (§4.G), grounded on the original
//! engine's `pool` class shape (`init`/`set_batch_size`/`search`) and on the
//! teacher's `engine::controller::SearchJob` for the start/poll/stop loop
//! around a set of worker threads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::evaluator::Evaluator;
use crate::moves::Move;
use crate::node::Node;
use crate::position::Position;
use crate::worker::{Status, Worker};

/// How often the controller polls worker status while a search is running.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Drives a fleet of [`Worker`]s against a single shared [`Node`] tree.
/// `init`/`set_batch_size` are process-wide mutable state mutated only
/// between searches, matching the original engine's `pool` (§5 Resource
/// policy).
pub struct Pool<E: Evaluator> {
    evaluator: Arc<E>,
    workers: Vec<Worker<E>>,
    batch_size: usize,
}

/// One line of live progress, handed to the caller's `on_status` callback
/// every poll interval (§4.G: "printing UCI `info` lines or a pretty
/// table" — the caller decides which).
#[derive(Clone, Debug)]
pub struct SearchProgress {
    pub elapsed_ms: u64,
    pub total_nodes: u64,
    pub nps: u64,
    pub workers: Vec<Status>,
}

impl<E: Evaluator + 'static> Pool<E> {
    /// Construct `num_threads` workers, all at the current batch size.
    #[must_use]
    pub fn init(evaluator: Arc<E>, num_threads: usize, batch_size: usize) -> Self {
        let num_threads = num_threads.max(1);
        let batch_size = batch_size.max(1);
        let workers = (0..num_threads)
            .map(|_| Worker::new(evaluator.clone(), batch_size))
            .collect();
        log::info!("pool initialized with {num_threads} workers, batch_size={batch_size}");
        Pool {
            evaluator,
            workers,
            batch_size,
        }
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resize every worker's batch buffers. Must not be called while a
    /// search is in progress.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        let batch_size = batch_size.max(1);
        self.batch_size = batch_size;
        for w in &mut self.workers {
            w.set_batch_size(batch_size);
        }
    }

    /// Change the number of worker threads. Must not be called while a
    /// search is in progress.
    pub fn set_num_threads(&mut self, num_threads: usize) {
        let num_threads = num_threads.max(1);
        while self.workers.len() < num_threads {
            self.workers.push(Worker::new(self.evaluator.clone(), self.batch_size));
        }
        self.workers.truncate(num_threads);
    }

    /// Run a search for up to `max_ms` against `position`, calling
    /// `on_status` every poll interval. Returns the move sampled from the
    /// root's children, weighted by visit count (§4.G).
    ///
    /// The wall-clock reference resets the first time any worker reports a
    /// nonzero node count, so per-thread warmup (spawning, first batch)
    /// never eats into the caller's time budget.
    pub fn search(
        &mut self,
        position: &Position,
        max_ms: u64,
        on_status: impl FnMut(&SearchProgress),
    ) -> Move {
        let root = self.run_search(position, max_ms, on_status);
        sample_by_visits(&root).unwrap_or(Move::NULL)
    }

    /// Run a search and additionally return the per-move visit-ratio
    /// distribution indexed the same way as a network policy output
    /// (mirrored for black to move), for the self-play trainer (§4.J).
    pub fn search_training(
        &mut self,
        position: &Position,
        max_ms: u64,
    ) -> (Move, Box<[f32; crate::POLICY_SIZE]>) {
        let root = self.run_search(position, max_ms, |_progress| {});
        let children = root.children();
        let total: u32 = children.iter().map(Node::visits).sum();
        let mut ratios = Box::new([0f32; crate::POLICY_SIZE]);
        for child in &children {
            let idx = mirrored_policy_index(child.action(), position.color_to_move());
            ratios[idx] = if total > 0 {
                child.visits() as f32 / total as f32
            } else {
                0.0
            };
        }
        let mv = sample_by_visits(&root).unwrap_or(Move::NULL);
        (mv, ratios)
    }

    /// Shared search loop: start workers, poll status until `max_ms` of
    /// warmed-up wall-clock has elapsed, stop and join, return the root.
    fn run_search(
        &mut self,
        position: &Position,
        max_ms: u64,
        mut on_status: impl FnMut(&SearchProgress),
    ) -> Arc<Node> {
        let root = Node::new(None, Move::NULL);
        log::info!("search starting: max_ms={max_ms}, threads={}", self.workers.len());

        for w in &mut self.workers {
            w.start(root.clone(), position.clone());
        }

        let mut clock_start = Instant::now();
        let mut warmed_up = false;
        loop {
            std::thread::sleep(POLL_INTERVAL);
            let statuses: Vec<Status> = self.workers.iter().map(Worker::status).collect();
            let total_nodes: u64 = statuses.iter().map(|s| s.node_count).sum();

            if !warmed_up && total_nodes > 0 {
                clock_start = Instant::now();
                warmed_up = true;
            }

            let elapsed_ms = clock_start.elapsed().as_millis() as u64;
            let nps = if elapsed_ms > 0 {
                total_nodes * 1000 / elapsed_ms
            } else {
                0
            };
            on_status(&SearchProgress {
                elapsed_ms,
                total_nodes,
                nps,
                workers: statuses,
            });

            if elapsed_ms >= max_ms {
                break;
            }
        }

        log::info!("search stopping, {} nodes searched", root.visits());
        for w in &mut self.workers {
            w.stop();
        }
        for w in &mut self.workers {
            w.join();
        }

        root
    }
}

/// The policy-index convention shared with [`crate::worker`]'s `lmm_input`
/// construction: `src*64+dst` for white to move, mirrored for black.
pub(crate) fn mirrored_policy_index(action: Move, color_to_move: crate::piece::Color) -> usize {
    let idx = action.policy_index();
    if color_to_move == crate::piece::Color::White {
        idx
    } else {
        4095 - idx
    }
}

/// Sample a child action with probability proportional to its visit count.
/// Returns `None` if the root never expanded (e.g. terminal position).
fn sample_by_visits(root: &Node) -> Option<Move> {
    let children = root.children();
    if children.is_empty() {
        return None;
    }
    let weights: Vec<u32> = children.iter().map(|c| c.visits().max(1)).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    let mut rng = thread_rng();
    Some(children[dist.sample(&mut rng)].action())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RandomEvaluator;

    #[test]
    fn search_returns_a_legal_root_move() {
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 2, 4);
        let pos = Position::new();
        let mv = pool.search(&pos, 50, |_progress| {});
        let legal = pos.legal_moves();
        assert!(legal.iter().any(|m| m.uci_eq(mv)));
    }

    #[test]
    fn search_training_ratios_sum_to_one() {
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 2, 4);
        let pos = Position::new();
        let (mv, ratios) = pool.search_training(&pos, 50);
        assert!(pos.legal_moves().iter().any(|m| m.uci_eq(mv)));
        let sum: f32 = ratios.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "ratios summed to {sum}");
    }

    #[test]
    fn set_num_threads_resizes_worker_vec() {
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 1, 4);
        pool.set_num_threads(3);
        assert_eq!(pool.num_threads(), 3);
        pool.set_num_threads(1);
        assert_eq!(pool.num_threads(), 1);
    }
}
