//! Frame-by-frame sliding of a freshly attached subtree into its constrained position.
//!
//! Nothing here schedules itself: a tick driver calls [`Animator::tick`] once per
//! frame and every in-flight [`Convergence`] takes exactly one step.

use kurbo::Point;

use crate::graph::{NodeGraph, NodeId};

pub const DEFAULT_STEP: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Arrived,
    /// The child was deleted.
    Vanished,
    /// Someone else moved the child since the last step.
    Interrupted,
}

impl StepOutcome {
    pub fn is_finished(self) -> bool {
        !matches!(self, StepOutcome::Moved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    child: NodeId,
    target: Point,
    last_written: Point,
}

impl Convergence {
    pub fn new(child: NodeId, start: Point, target: Point) -> Self {
        Self {
            child,
            target,
            last_written: start,
        }
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    pub fn target(&self) -> Point {
        self.target
    }

    /// Moves the child subtree at most `unit` along one axis, x before y.
    pub fn step(&mut self, graph: &mut NodeGraph, unit: f64) -> StepOutcome {
        let Some(node) = graph.get(self.child) else {
            return StepOutcome::Vanished;
        };
        let current = node.position();
        if current != self.last_written {
            return StepOutcome::Interrupted;
        }
        if current == self.target {
            return StepOutcome::Arrived;
        }

        let next = if current.x != self.target.x {
            Point::new(approach(current.x, self.target.x, unit), current.y)
        } else {
            Point::new(current.x, approach(current.y, self.target.y, unit))
        };
        if !graph.reposition(self.child, next) {
            return StepOutcome::Vanished;
        }
        self.last_written = next;

        if next == self.target {
            StepOutcome::Arrived
        } else {
            StepOutcome::Moved
        }
    }
}

fn approach(from: f64, to: f64, unit: f64) -> f64 {
    let remaining = to - from;
    if remaining.abs() <= unit {
        to
    } else {
        from + unit.copysign(remaining)
    }
}

/// In-flight convergences, at most one per child.
#[derive(Debug, Clone, PartialEq)]
pub struct Animator {
    unit: f64,
    active: Vec<Convergence>,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}

impl Animator {
    pub fn new(unit: f64) -> Self {
        Self {
            unit,
            active: Vec::new(),
        }
    }

    pub fn start(&mut self, convergence: Convergence) {
        self.active.retain(|running| running.child != convergence.child);
        self.active.push(convergence);
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active(&self) -> &[Convergence] {
        &self.active
    }

    /// Advances every convergence once and returns how many are still running.
    pub fn tick(&mut self, graph: &mut NodeGraph) -> usize {
        let unit = self.unit;
        self.active.retain_mut(|convergence| {
            let outcome = convergence.step(graph, unit);
            if outcome.is_finished() {
                tracing::trace!(child = convergence.child, ?outcome, "convergence finished");
            }
            !outcome.is_finished()
        });
        self.active.len()
    }

    /// Drops the convergence driving `child`, if any.
    pub fn cancel(&mut self, child: NodeId) -> bool {
        let before = self.active.len();
        self.active.retain(|running| running.child != child);
        self.active.len() != before
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
