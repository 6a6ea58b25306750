//! Deferred draws against surfaces that are not ready yet.
//!
//! A draw that hits an unsized layer is parked here and retried with an
//! exponential delay from the session's [`RetryPolicy`]. Once the attempt
//! budget is spent the draw is dropped.

use crate::layers::{DrawOp, LayerKind};
use pagemark_core::RetryPolicy;
use std::time::Instant;

/// One parked draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredDraw {
    pub layer: LayerKind,
    pub op: DrawOp,
    /// Retries already made.
    pub attempt: u32,
    /// Earliest time the next retry may run.
    pub due: Instant,
}

/// Queue of draws waiting for a surface.
#[derive(Debug, Clone)]
pub struct DeferredQueue {
    policy: RetryPolicy,
    pending: Vec<DeferredDraw>,
}

impl DeferredQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: Vec::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Park a draw; the first retry runs after the base delay.
    pub fn push(&mut self, layer: LayerKind, op: DrawOp, now: Instant) {
        self.pending.push(DeferredDraw {
            layer,
            op,
            attempt: 0,
            due: now + self.policy.delay_for(0),
        });
    }

    /// Remove and return every draw whose delay has elapsed, oldest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<DeferredDraw> {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|draw| draw.due <= now);
        self.pending = waiting;
        due
    }

    /// Park a draw again after a failed retry.
    ///
    /// Returns false when the retry budget is exhausted and the draw was dropped.
    pub fn retry(&mut self, mut draw: DeferredDraw, now: Instant) -> bool {
        draw.attempt += 1;
        if draw.attempt >= self.policy.max_attempts {
            log::warn!(
                "dropping {:?} draw after {} attempts: surface never became ready",
                draw.layer,
                draw.attempt
            );
            return false;
        }
        draw.due = now + self.policy.delay_for(draw.attempt);
        self.pending.push(draw);
        true
    }

    /// Drop every parked draw for one layer, e.g. when it is repainted whole.
    pub fn discard(&mut self, layer: LayerKind) -> usize {
        let before = self.pending.len();
        self.pending.retain(|draw| draw.layer != layer);
        before - self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
