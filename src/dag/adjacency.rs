//! Adjacency repair after an edge split, and the merge of redundant stacks.
//!
//! Splitting every pierced trapezoid leaves the new left/right couples with
//! half-wired neighbor lists: the right halves kept the originals' lists, the
//! left halves start empty. Repair runs in two phases over the couples,
//! ordered top to bottom: first the two edge endpoints, then every pair of
//! consecutive couples.

use smallvec::smallvec;

use super::{InvariantViolation, Trapezoidation};
use crate::{
    math::Edge,
    trapezoid::{TrapKey, replace_neighbor},
};

impl Trapezoidation {
    pub(super) fn repair_adjacency(
        &mut self,
        edge: Edge,
        couples: &[(TrapKey, TrapKey)],
        top_just_inserted: bool,
        bottom_just_inserted: bool,
    ) -> Result<(), InvariantViolation> {
        let topmost = couples[0];
        let bottommost = couples[couples.len() - 1];
        self.repair_at_edge_end(edge, topmost, top_just_inserted, true)?;
        self.repair_at_edge_end(edge, bottommost, bottom_just_inserted, false)?;

        for window in couples.windows(2) {
            let (upper_left, upper_right) = window[0];
            let (lower_left, lower_right) = window[1];

            if self.traps[upper_right].below.len() == 2 {
                // Another edge ends on the boundary between the couples.
                self.repair_across_branch(
                    edge, lower_left, lower_right, upper_left, upper_right, false,
                )?;
            } else if self.traps[lower_right].above.len() == 2 {
                self.repair_across_branch(
                    edge, upper_left, upper_right, lower_left, lower_right, true,
                )?;
            } else {
                self.traps[upper_left].below = smallvec![lower_left];
                self.traps[lower_left].above = smallvec![upper_left];
            }
        }

        Ok(())
    }

    /// Fixes the exterior adjacency of the couple at one end of the inserted
    /// edge.
    ///
    /// A freshly split endpoint has exactly one exterior neighbor, which both
    /// halves now touch. An endpoint landing on a pre-existing vertex ends
    /// against whatever side edges meet there: terminating on the couple's
    /// left side edge leaves the left half degenerate at this end, on the
    /// right side edge it leaves the right half degenerate, and with two
    /// exterior neighbors each half keeps the one on its side.
    fn repair_at_edge_end(
        &mut self,
        edge: Edge,
        (end_left, end_right): (TrapKey, TrapKey),
        end_just_inserted: bool,
        top_end: bool,
    ) -> Result<(), InvariantViolation> {
        let exterior = self.traps[end_right].adjacent(top_end).clone();

        if end_just_inserted {
            let neighbor = exterior
                .first()
                .copied()
                .ok_or(InvariantViolation("fresh edge endpoint has no exterior neighbor"))?;
            *self.traps[end_left].adjacent_mut(top_end) = exterior;
            *self.traps[neighbor].adjacent_mut(!top_end) = smallvec![end_left, end_right];
            return Ok(());
        }

        let end = edge.vertex(top_end);
        let left_side_end = self.traps[end_left].left_edge.map(|side| side.vertex(top_end));
        let right_side_end =
            self.traps[end_right].right_edge().map(|side| side.vertex(top_end));

        if left_side_end == Some(end) {
            // The left half narrows to nothing at this end; its exterior
            // list stays empty.
        } else if right_side_end == Some(end) {
            let neighbor = exterior
                .first()
                .copied()
                .ok_or(InvariantViolation("edge endpoint on the right side has no neighbor"))?;
            *self.traps[end_left].adjacent_mut(top_end) = exterior;
            self.traps[end_right].adjacent_mut(top_end).clear();
            replace_neighbor(self.traps[neighbor].adjacent_mut(!top_end), end_right, end_left);
        } else {
            let &[exterior_left, exterior_right] = exterior.as_slice() else {
                return Err(InvariantViolation("edge endpoint expected two exterior neighbors"));
            };
            *self.traps[end_left].adjacent_mut(top_end) = smallvec![exterior_left];
            *self.traps[end_right].adjacent_mut(top_end) = smallvec![exterior_right];
            replace_neighbor(
                self.traps[exterior_left].adjacent_mut(!top_end),
                end_right,
                end_left,
            );
        }

        Ok(())
    }

    /// Wires two consecutive couples across a horizontal boundary that also
    /// carries a branch: couple `b` sees two neighbors on its `upward` side.
    /// The extra trapezoid is attached to whichever side of the edge its
    /// inner corner projects to.
    fn repair_across_branch(
        &mut self,
        edge: Edge,
        left_a: TrapKey,
        right_a: TrapKey,
        left_b: TrapKey,
        right_b: TrapKey,
        upward: bool,
    ) -> Result<(), InvariantViolation> {
        *self.traps[left_a].adjacent_mut(!upward) = smallvec![left_b];

        let extra = self.traps[right_b]
            .adjacent(upward)
            .first()
            .copied()
            .ok_or(InvariantViolation("branching boundary lost its neighbors"))?;
        let corner = self.traps[extra]
            .extreme_point(!upward, true)
            .ok_or(InvariantViolation("branch trapezoid lost its inner corner"))?;

        if edge.coords_right_of(corner) {
            // The branch lies right of the edge; the originals' adjacency
            // already covers it.
            *self.traps[left_b].adjacent_mut(upward) = smallvec![left_a];
            return Ok(());
        }

        *self.traps[right_a].adjacent_mut(!upward) = smallvec![right_b];
        *self.traps[right_b].adjacent_mut(upward) = smallvec![right_a];
        *self.traps[left_b].adjacent_mut(upward) = smallvec![extra, left_a];
        *self.traps[extra].adjacent_mut(!upward) = smallvec![left_b];

        Ok(())
    }

    /// Collapses runs of consecutive couples whose halves carry identical
    /// side edges. Each column (left halves, then right halves) is scanned
    /// top to bottom; every maximal run merges into its topmost trapezoid.
    pub(super) fn merge_redundant_stacks(&mut self, couples: &[(TrapKey, TrapKey)]) {
        for right_column in [false, true] {
            let pick = |couple: &(TrapKey, TrapKey)| {
                if right_column { couple.1 } else { couple.0 }
            };

            let mut stack = vec![pick(&couples[0])];
            for couple in &couples[1..] {
                let trap = pick(couple);
                let last = stack[stack.len() - 1];

                if self.traps[last].left_edge != self.traps[trap].left_edge
                    || self.traps[last].right_edge() != self.traps[trap].right_edge()
                {
                    self.merge_stack(&stack);
                    stack.clear();
                }
                stack.push(trap);
            }
            self.merge_stack(&stack);
        }
    }

    /// Merges a vertical run into its topmost trapezoid: the top takes over
    /// the bottom's lower bound and neighbors, and every merged-away leaf has
    /// its parents redirected to the surviving leaf.
    fn merge_stack(&mut self, stack: &[TrapKey]) {
        if stack.len() < 2 {
            return;
        }

        let top = stack[0];
        let bottom = stack[stack.len() - 1];

        let bottom_below = std::mem::take(&mut self.traps[bottom].below);
        for &neighbor in &bottom_below {
            replace_neighbor(self.traps[neighbor].adjacent_mut(true), bottom, top);
        }
        self.traps[top].bottom_vertex = self.traps[bottom].bottom_vertex;
        self.traps[top].below = bottom_below;

        let surviving_leaf = self.traps[top].node;
        for &merged in &stack[1..] {
            let leaf = self.traps[merged].node;
            self.redirect_parent_links(leaf, surviving_leaf);
            self.set_right_edge(merged, None);
            self.traps.remove(merged);
        }
    }
}
