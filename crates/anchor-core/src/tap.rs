// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-slot tap hand-off between the input timeline and the frame loop.
//!
//! [`TapSlot`] is a capacity-one mailbox whose send overwrites. The frame loop
//! takes at most one tap per frame; nothing is queued or replayed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::ports::Tap;

/// Capacity-one, overwrite-on-send mailbox.
#[derive(Debug, Default)]
pub struct TapSlot {
    slot: Mutex<Option<Tap>>,
}

impl TapSlot {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `tap`, replacing any unconsumed one. Returns the replaced tap.
    pub fn send(&self, tap: Tap) -> Option<Tap> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(tap)
    }

    /// Take the tap, leaving the slot empty.
    pub fn take(&self) -> Option<Tap> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// `true` if a tap is waiting.
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// What the input system is told about a tap. Always consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDisposition {
    /// Queued for the next frame.
    Accepted,
    /// Dropped (input blocked or session inactive); still consumed.
    Ignored,
}

impl TapDisposition {
    /// The gesture is never propagated further.
    pub const fn handled(self) -> bool {
        matches!(self, Self::Accepted | Self::Ignored)
    }
}

/// Gatekeeper in front of the [`TapSlot`]: drops taps while a host request
/// holds input.
#[derive(Debug, Default)]
pub struct TapRouter {
    slot: TapSlot,
    input_blocked: AtomicBool,
}

impl TapRouter {
    /// Router with input open and no tap waiting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Input timeline entry point; never blocks.
    pub fn on_tap(&self, tap: Tap) -> TapDisposition {
        if self.input_blocked.load(Ordering::Acquire) {
            trace!(x = tap.x, y = tap.y, "tap ignored while input blocked");
            return TapDisposition::Ignored;
        }
        if self.slot.send(tap).is_some() {
            trace!("unconsumed tap overwritten");
        }
        TapDisposition::Accepted
    }

    /// Frame timeline: take this frame's tap, if any.
    pub fn consume_tap(&self) -> Option<Tap> {
        self.slot.take()
    }

    /// Drop any waiting tap.
    pub fn clear(&self) {
        self.slot.take();
    }

    /// Block or unblock input (a modal progress indicator is up).
    pub fn set_input_blocked(&self, blocked: bool) {
        self.input_blocked.store(blocked, Ordering::Release);
    }

    /// Whether taps are currently being dropped.
    pub fn input_blocked(&self) -> bool {
        self.input_blocked.load(Ordering::Acquire)
    }

    /// `true` if a tap is waiting for the next frame.
    pub fn has_pending(&self) -> bool {
        self.slot.is_pending()
    }
}
