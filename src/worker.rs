//! A single search thread (§4.F), grounded on the original engine's
//! `worker` class: a cloned position, pre-sized batch buffers, and a
//! recursive leaf-assembly step (`make_batch`) feeding the shared
//! [`Evaluator`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::evaluator::Evaluator;
use crate::moves::Move;
use crate::node::Node;
use crate::piece::Color;
use crate::position::{Position, SQUARE_BITS};
use crate::POLICY_SIZE;

pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Live progress snapshot, polled by the controller for `info`/status
/// display (§4.F Status).
#[derive(Clone, Debug, Default)]
pub struct Status {
    pub code: String,
    pub batch_count: u64,
    pub node_count: u64,
    pub batch_avg_ms: u64,
    pub exec_avg_ms: u64,
}

struct BatchRow {
    new_children: Vec<Arc<Node>>,
    leaf: Arc<Node>,
}

/// One search thread. Owns its own `Position` — make/unmake on it is never
/// synchronized, because no other thread observes this copy.
pub struct Worker<E: Evaluator> {
    evaluator: Arc<E>,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<Status>>,
    max_batch_size: usize,
    thread: Option<JoinHandle<()>>,
}

impl<E: Evaluator + 'static> Worker<E> {
    #[must_use]
    pub fn new(evaluator: Arc<E>, batch_size: usize) -> Self {
        Worker {
            evaluator,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(Status {
                code: "uninitialized".to_string(),
                ..Status::default()
            })),
            max_batch_size: batch_size.max(1),
            thread: None,
        }
    }

    pub fn set_batch_size(&mut self, bsize: usize) {
        self.max_batch_size = bsize.max(1);
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status.lock().clone()
    }

    /// Spawn the build-evaluate loop against `root`, starting from a clone
    /// of `root_pos`. Runs until [`Worker::stop`] is called.
    pub fn start(&mut self, root: Arc<Node>, root_pos: Position) {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let status = self.status.clone();
        let evaluator = self.evaluator.clone();
        let batch_size = self.max_batch_size;

        self.thread = Some(std::thread::spawn(move || {
            let mut pos = root_pos;
            let mut runner = BatchRunner {
                pos: &mut pos,
                batch_size,
                rows: Vec::with_capacity(batch_size),
                terminal_hits: 0,
                board_input: vec![0.0; batch_size * 8 * 8 * SQUARE_BITS],
                lmm_input: vec![0.0; batch_size * POLICY_SIZE],
            };

            log::debug!("worker thread starting, batch_size={batch_size}");
            while running.load(Ordering::SeqCst) {
                status.lock().code = "building".to_string();
                let batch_start = Instant::now();
                runner.rows.clear();
                runner.terminal_hits = 0;
                runner.make_batch(&root, batch_size);
                let batch_ms = batch_start.elapsed().as_millis() as u64;
                log::trace!(
                    "batch composed: {} rows, {} terminal hits, {batch_ms}ms",
                    runner.rows.len(),
                    runner.terminal_hits
                );

                if runner.terminal_hits > 0 {
                    status.lock().node_count += runner.terminal_hits;
                }

                if runner.rows.is_empty() {
                    continue;
                }

                status.lock().code = "execute ".to_string();
                let exec_start = Instant::now();
                let batch_size_actual = runner.rows.len();
                let outputs = evaluator.evaluate(
                    &runner.board_input[..batch_size_actual * 8 * 8 * SQUARE_BITS],
                    &runner.lmm_input[..batch_size_actual * POLICY_SIZE],
                    batch_size_actual,
                );
                let exec_ms = exec_start.elapsed().as_millis() as u64;
                log::trace!("evaluated {batch_size_actual} rows in {exec_ms}ms");

                for (row, output) in runner.rows.drain(..).zip(outputs) {
                    for child in &row.new_children {
                        child.apply_policy(&row.leaf, &output.policy);
                    }
                    if row.leaf.set_children(row.new_children) {
                        row.leaf.backprop(output.value);
                    }
                }

                let mut s = status.lock();
                s.batch_count += 1;
                s.node_count += batch_size_actual as u64;
                s.batch_avg_ms = running_avg(s.batch_avg_ms, batch_ms, s.batch_count);
                s.exec_avg_ms = running_avg(s.exec_avg_ms, exec_ms, s.batch_count);
            }
        }));
    }

    pub fn stop(&self) {
        log::debug!("worker stop requested");
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn running_avg(prev_avg: u64, sample: u64, count: u64) -> u64 {
    if count <= 1 {
        sample
    } else {
        prev_avg + (sample.saturating_sub(prev_avg)) / count
    }
}

/// Scratch state threaded through the recursive `build_batch` descent; kept
/// separate from `Worker` so its buffers are owned by the worker thread
/// rather than shared across threads.
struct BatchRunner<'a> {
    pos: &'a mut Position,
    batch_size: usize,
    rows: Vec<BatchRow>,
    terminal_hits: u64,
    board_input: Vec<f32>,
    lmm_input: Vec<f32>,
}

impl<'a> BatchRunner<'a> {
    fn make_batch(&mut self, node: &Arc<Node>, allocated: usize) -> usize {
        if self.rows.len() >= self.batch_size || allocated == 0 {
            return 0;
        }

        if node.has_children() {
            return self.descend_children(node, allocated);
        }

        if node.backprop_terminal(1.0) {
            self.terminal_hits += 1;
            return 0;
        }

        if self.pos.is_draw() {
            node.backprop_terminal(0.0);
            self.terminal_hits += 1;
            return 0;
        }

        let pl_moves = self.pos.pseudolegal_moves();
        let mut new_children = Vec::new();
        let color_to_move = self.pos.color_to_move();

        for m in &pl_moves {
            if self.pos.make_move(*m) {
                new_children.push(Node::new(Some(node.clone()), *m));
            }
            self.pos.unmake_move();
        }

        if new_children.is_empty() {
            let terminal = if self.pos.is_check() { -1.0 } else { 0.0 };
            node.backprop_terminal(terminal);
            self.terminal_hits += 1;
            return 0;
        }

        let row = self.rows.len();
        let lmm_row = &mut self.lmm_input[row * POLICY_SIZE..(row + 1) * POLICY_SIZE];
        lmm_row.fill(0.0);
        for child in &new_children {
            let action = child.action();
            let idx = if color_to_move == Color::White {
                action.policy_index()
            } else {
                4095 - action.policy_index()
            };
            lmm_row[idx] = 1.0;
        }

        let board_row_len = 8 * 8 * SQUARE_BITS;
        self.board_input[row * board_row_len..(row + 1) * board_row_len]
            .copy_from_slice(self.pos.input_tensor(color_to_move));

        self.rows.push(BatchRow {
            new_children,
            leaf: node.clone(),
        });
        1
    }

    fn descend_children(&mut self, node: &Arc<Node>, allocated: usize) -> usize {
        let mut children = node.children();
        if children.is_empty() {
            return 0;
        }
        let parent_n = node.visits();
        let parent_total_p = node.total_p();
        children.sort_by(|a, b| {
            b.uct(parent_n, parent_total_p)
                .partial_cmp(&a.uct(parent_n, parent_total_p))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let scores: Vec<f32> = children.iter().map(|c| c.uct(parent_n, parent_total_p).max(0.0)).collect();
        let total: f32 = scores.iter().sum::<f32>().max(f32::EPSILON);

        let mut added = 0;
        let mut remaining = allocated;
        let mut remaining_total = total;
        for (child, score) in children.iter().zip(scores.iter()) {
            if remaining == 0 || self.rows.len() >= self.batch_size {
                break;
            }
            let share = ((*score / remaining_total) * remaining as f32).round() as usize;
            let share = share.clamp(1, remaining);
            let action = child.action();
            self.pos.make_move(action);
            added += self.make_batch(child, share);
            self.pos.unmake_move();
            remaining = remaining.saturating_sub(share);
            remaining_total = (remaining_total - score).max(f32::EPSILON);
        }
        added
    }
}

/// The move returned to a UCI caller: `action` applied to this worker's
/// owning pool, used for making the root position match the move played.
pub type Action = Move;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_batch_round_expands_root() {
        let root = Node::new(None, Move::NULL);
        let mut pos = Position::new();
        let mut runner = BatchRunner {
            pos: &mut pos,
            batch_size: 4,
            rows: Vec::new(),
            terminal_hits: 0,
            board_input: vec![0.0; 4 * 8 * 8 * SQUARE_BITS],
            lmm_input: vec![0.0; 4 * POLICY_SIZE],
        };
        let added = runner.make_batch(&root, 4);
        assert_eq!(added, 1);
        assert_eq!(runner.rows.len(), 1);
        assert_eq!(runner.rows[0].new_children.len(), 20);
    }

    #[test]
    fn terminal_position_consumes_no_slot() {
        // White to move, stalemated: king on a1, black king on c2, black queen on b3.
        let root = Node::new(None, Move::NULL);
        let mut pos = Position::from_fen("8/8/8/8/8/1qk5/8/K7 w - - 0 1").unwrap();
        let mut runner = BatchRunner {
            pos: &mut pos,
            batch_size: 4,
            rows: Vec::new(),
            terminal_hits: 0,
            board_input: vec![0.0; 4 * 8 * 8 * SQUARE_BITS],
            lmm_input: vec![0.0; 4 * POLICY_SIZE],
        };
        let added = runner.make_batch(&root, 4);
        assert_eq!(added, 0);
        assert_eq!(root.visits(), 1);
        assert_eq!(root.total_value(), 0.0);
    }
}
