//! The shared-ownership MCTS tree (§4.E), grounded on the original engine's
//! `node` class: `(n, w)`, `p`, `total_p`, and the cached terminal value are
//! each held under their own `parking_lot::Mutex`; only the one-shot child
//! publication flag is a plain atomic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::moves::Move;
use crate::piece::Color;

/// Controls the tendency of UCT to favor nodes with lower visit counts.
pub const EXPLORATION: f32 = std::f32::consts::SQRT_2;
/// Additional weight given to the policy prior in the UCT calculation.
pub const POLICY_WEIGHT: f32 = 5.0;

/// `n` and `w` are updated together under one lock rather than as separate
/// atomics, so a reader never observes `w` updated without its matching `n`.
#[derive(Default)]
struct Stats {
    n: u32,
    w: f32,
}

/// A node in the shared search tree. Every field a worker might touch
/// concurrently is either an atomic or guarded by `stats`; `children` is
/// populated exactly once via [`Node::set_children`] and never mutated
/// again, so readers may freely clone the `Arc` without synchronization.
pub struct Node {
    /// Side to move at this node (the side whose decision `action` represents
    /// was made by the opposite color — `pov` flips one ply per parent link).
    pov: Color,
    action: Move,
    parent: Mutex<Option<Arc<Node>>>,

    stats: Mutex<Stats>,
    /// Policy prior, written once by [`Node::apply_policy`].
    p: Mutex<f32>,
    /// Running total of children's priors, read by UCT's normalization term.
    total_p: Mutex<f32>,
    terminal: Mutex<f32>,
    has_children: AtomicBool,
    children: Mutex<Vec<Arc<Node>>>,
}

impl Node {
    /// A new unexpanded node. `action` is the move that led here from
    /// `parent` (or [`Move::NULL`] for the root).
    #[must_use]
    pub fn new(parent: Option<Arc<Node>>, action: Move) -> Arc<Node> {
        let pov = match &parent {
            Some(p) => p.pov.opposite(),
            None => Color::White,
        };
        Arc::new(Node {
            pov,
            action,
            parent: Mutex::new(parent),
            stats: Mutex::new(Stats::default()),
            p: Mutex::new(0.0),
            total_p: Mutex::new(0.0),
            terminal: Mutex::new(1.0),
            has_children: AtomicBool::new(false),
            children: Mutex::new(Vec::new()),
        })
    }

    #[inline]
    #[must_use]
    pub fn pov(&self) -> Color {
        self.pov
    }

    #[inline]
    #[must_use]
    pub fn action(&self) -> Move {
        self.action
    }

    #[inline]
    #[must_use]
    pub fn visits(&self) -> u32 {
        self.stats.lock().n
    }

    #[inline]
    #[must_use]
    pub fn total_value(&self) -> f32 {
        self.stats.lock().w
    }

    #[inline]
    #[must_use]
    pub fn prior(&self) -> f32 {
        *self.p.lock()
    }

    #[inline]
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.has_children.load(Ordering::Acquire)
    }

    /// Snapshot of current children (empty if not yet expanded).
    #[must_use]
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.children.lock().clone()
    }

    /// This node's UCT score from its parent's point of view (§4.E).
    ///
    /// `stats.w`/`stats.n` accumulate value from *this* node's own POV (the
    /// side to move here, which is the parent's opponent), so the
    /// exploitation term is negated: a line that's bad for this node's own
    /// side is exactly the line the parent wants to keep choosing.
    #[must_use]
    pub fn uct(&self, parent_n: u32, parent_total_p: f32) -> f32 {
        let stats = self.stats.lock();
        let exploitation = -stats.w / (stats.n as f32 + 1.0);
        let prior = *self.p.lock();
        let policy_term = if parent_total_p > 0.0 {
            POLICY_WEIGHT * (prior / parent_total_p)
        } else {
            0.0
        };
        let exploration = EXPLORATION * ((parent_n as f32).ln().max(0.0) / (stats.n as f32 + 1.0)).sqrt();
        exploitation + policy_term + exploration
    }

    /// Attempt to publish `new_children` as this node's child list. One-shot:
    /// the first caller wins, every other caller's children are discarded
    /// and `false` is returned.
    #[must_use]
    pub fn set_children(&self, new_children: Vec<Arc<Node>>) -> bool {
        if self.has_children.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.children.lock() = new_children;
        true
    }

    /// Set the cached terminal value (from this node's POV) and backprop it,
    /// following the original engine's "only update on loss/draw" rule:
    /// `tv < 1.0` is meaningful, `tv = 1.0` means "not terminal / unknown".
    #[must_use]
    pub fn backprop_terminal(&self, tv: f32) -> bool {
        {
            let mut terminal = self.terminal.lock();
            if tv < 1.0 {
                *terminal = tv;
            }
        }
        let terminal = *self.terminal.lock();
        if terminal < 1.0 {
            self.backprop(terminal);
            true
        } else {
            false
        }
    }

    /// Backpropagate `value` (from this node's POV) up through the tree,
    /// negating at each parent link since each ply flips the side to move.
    pub fn backprop(self: &Arc<Self>, value: f32) {
        {
            let mut stats = self.stats.lock();
            stats.n += 1;
            stats.w += value;
        }
        log::trace!("backprop {value} into {:?} move", self.action);
        if let Some(parent) = self.parent.lock().clone() {
            parent.backprop(-value);
        }
    }

    /// Apply a batch's policy output to this leaf node: read its prior from
    /// `policy` at the POV-appropriate index and add it to `parent`'s
    /// running prior total (§4.E).
    pub fn apply_policy(&self, parent: &Node, policy: &[f32; crate::POLICY_SIZE]) {
        let idx = if parent.pov == Color::White {
            self.action.policy_index()
        } else {
            4095 - self.action.policy_index()
        };
        let prior = policy[idx];
        *self.p.lock() = prior;
        *parent.total_p.lock() += prior;
    }

    #[inline]
    #[must_use]
    pub fn total_p(&self) -> f32 {
        *self.total_p.lock()
    }

    /// Find the child whose action matches `action` (UCI-equality), detach
    /// its parent link, and return it. Used to re-root the tree onto the
    /// move actually played (§4.G).
    #[must_use]
    pub fn move_child(self: &Arc<Self>, action: Move) -> Option<Arc<Node>> {
        let child = self
            .children
            .lock()
            .iter()
            .find(|c| c.action.uci_eq(action))
            .cloned()?;
        *child.parent.lock() = None;
        Some(child)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("action", &self.action)
            .field("pov", &self.pov)
            .field("n", &self.visits())
            .field("w", &self.total_value())
            .field("p", &self.prior())
            .field("has_children", &self.has_children())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square;

    #[test]
    fn root_has_no_parent_and_white_pov() {
        let root = Node::new(None, Move::NULL);
        assert_eq!(root.pov(), Color::White);
        assert!(root.parent.lock().is_none());
    }

    #[test]
    fn child_pov_flips_from_parent() {
        let root = Node::new(None, Move::NULL);
        let child = Node::new(Some(root.clone()), Move::new(Square::from_index(12), Square::from_index(28), None, 0));
        assert_eq!(child.pov(), Color::Black);
    }

    #[test]
    fn set_children_is_one_shot() {
        let root = Node::new(None, Move::NULL);
        let a = vec![Node::new(Some(root.clone()), Move::NULL)];
        let b = vec![Node::new(Some(root.clone()), Move::NULL), Node::new(Some(root.clone()), Move::NULL)];
        assert!(root.set_children(a));
        assert!(!root.set_children(b));
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn backprop_increments_and_negates_up_the_tree() {
        let root = Node::new(None, Move::NULL);
        let child = Node::new(Some(root.clone()), Move::NULL);
        child.backprop(0.5);
        assert_eq!(child.visits(), 1);
        assert_eq!(child.total_value(), 0.5);
        assert_eq!(root.visits(), 1);
        assert_eq!(root.total_value(), -0.5);
    }

    #[test]
    fn backprop_terminal_only_updates_on_loss_or_draw() {
        let node = Node::new(None, Move::NULL);
        assert!(!node.backprop_terminal(1.0));
        assert!(node.backprop_terminal(0.0));
        assert_eq!(node.visits(), 1);
        // A later call with tv=1.0 replays the cached (now-terminal) value.
        assert!(node.backprop_terminal(1.0));
        assert_eq!(node.visits(), 2);
    }

    #[test]
    fn move_child_detaches_parent() {
        let root = Node::new(None, Move::NULL);
        let action = Move::new(Square::from_index(1), Square::from_index(2), None, 0);
        let child = Node::new(Some(root.clone()), action);
        assert!(root.set_children(vec![child.clone()]));
        let found = root.move_child(action).unwrap();
        assert!(found.parent.lock().is_none());
    }
}
