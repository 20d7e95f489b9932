//! Document-order comparison.
//!
//! Document order is the order nodes are encountered in a depth-first,
//! pre-order traversal: an ancestor sorts before its descendants, and
//! siblings sort by position in the child chain.

use super::{Document, NodeId};
use std::cmp::Ordering;

impl Document {
    /// Returns `true` if `a` precedes `b` in document order.
    #[must_use]
    pub fn is_before(&self, a: NodeId, b: NodeId) -> bool {
        compare_in_document_order(self, a, b) == Ordering::Less
    }

    /// Returns `true` if `a` follows `b` in document order.
    #[must_use]
    pub fn is_after(&self, a: NodeId, b: NodeId) -> bool {
        compare_in_document_order(self, a, b) == Ordering::Greater
    }

    /// Sorts a list of nodes into document order.
    ///
    /// Each comparison is O(depth + siblings), so sorting large lists drawn
    /// from wide sibling ranges is quadratic in the worst case.
    pub fn sort_in_document_order(&self, nodes: &mut [NodeId]) {
        nodes.sort_by(|&a, &b| compare_in_document_order(self, a, b));
    }
}

/// Computes a total order between two nodes of the same arena.
///
/// If one node is a strict ancestor of the other, the ancestor sorts first.
/// Otherwise the two ancestor chains are climbed to the nearest common
/// container and the positions of its two children are compared by scanning
/// the sibling chain. The cost is O(depth + siblings) per comparison — not
/// O(1) — so repeated sorting over very wide sibling lists is quadratic.
///
/// Nodes with no common ancestor (detached subtrees) are ordered by their
/// trees' root ids: an arbitrary but deterministic total order, stable for
/// the life of the arena, so sorts that mix unrelated trees stay stable
/// across runs.
#[must_use]
#[allow(clippy::expect_used)]
pub fn compare_in_document_order(doc: &Document, a: NodeId, b: NodeId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let depth_a = doc.ancestors(a).count();
    let depth_b = doc.ancestors(b).count();

    // Climb the deeper node up to the shallower one's level. If the climb
    // lands on the other node, that node is a strict ancestor and sorts
    // first.
    let mut x = a;
    let mut y = b;
    if depth_a > depth_b {
        for _ in 0..depth_a - depth_b {
            x = doc.parent(x).expect("climb is bounded by counted depth");
        }
        if x == y {
            return Ordering::Greater;
        }
    } else if depth_b > depth_a {
        for _ in 0..depth_b - depth_a {
            y = doc.parent(y).expect("climb is bounded by counted depth");
        }
        if x == y {
            return Ordering::Less;
        }
    }

    // Climb both chains in lockstep until the parents meet.
    loop {
        match (doc.parent(x), doc.parent(y)) {
            (Some(px), Some(py)) if px == py => {
                // Siblings under the common container: scan forward from x.
                let mut cur = doc.next_sibling(x);
                while let Some(id) = cur {
                    if id == y {
                        return Ordering::Less;
                    }
                    cur = doc.next_sibling(id);
                }
                return Ordering::Greater;
            }
            (Some(px), Some(py)) => {
                x = px;
                y = py;
            }
            // Both are roots of unrelated trees (equal depth, no parents).
            _ => return x.cmp(&y),
        }
    }
}
