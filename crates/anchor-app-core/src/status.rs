// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transient status messages ("processing", "success", "error: ...") with TTL + dedupe.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// What a status line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Work is in flight (hosting, resolving).
    Processing,
    /// A single operation finished successfully.
    Success,
    /// An operation failed; the body carries details.
    Error,
    /// Terminal: every pending anchor has been resolved.
    Done,
}

/// Identifier for a status entry.
pub type StatusId = u64;

#[derive(Debug, Clone)]
struct StatusEntry {
    id: StatusId,
    kind: StatusKind,
    title: String,
    body: Option<String>,
    ttl: Duration,
    created: Instant,
}

/// Rendering-friendly view of a status line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    /// Stable identifier.
    pub id: StatusId,
    /// Severity / category.
    pub kind: StatusKind,
    /// Short title line.
    pub title: String,
    /// Optional details.
    pub body: Option<String>,
    /// 1.0 -> just posted, 0.0 -> expired.
    pub progress: f32,
}

/// In-memory status queue with TTL and a dedupe window.
pub struct StatusBoard {
    queue: VecDeque<StatusEntry>,
    max: usize,
    dedupe_window: Duration,
    next_id: StatusId,
}

impl StatusBoard {
    /// Create a board holding at most `max` lines (oldest evicted first).
    pub fn new(max: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max: max.max(1),
            dedupe_window: Duration::from_millis(500),
            next_id: 1,
        }
    }

    /// Post a line. An identical line posted within the dedupe window is
    /// refreshed instead of duplicated.
    pub fn post<S, B>(
        &mut self,
        kind: StatusKind,
        title: S,
        body: B,
        ttl: Duration,
        now: Instant,
    ) -> StatusId
    where
        S: Into<String>,
        B: Into<Option<String>>,
    {
        let title = title.into();
        let body = body.into();

        if let Some(existing) = self.queue.iter_mut().find(|e| {
            e.kind == kind
                && e.title == title
                && e.body == body
                && now.saturating_duration_since(e.created) <= self.dedupe_window
        }) {
            existing.created = now;
            existing.ttl = ttl;
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        if self.queue.len() == self.max {
            self.queue.pop_front();
        }
        self.queue.push_back(StatusEntry {
            id,
            kind,
            title,
            body,
            ttl,
            created: now,
        });
        id
    }

    /// Drop expired lines (call once per frame).
    pub fn retain_visible(&mut self, now: Instant) {
        self.queue
            .retain(|e| now.saturating_duration_since(e.created) < e.ttl);
    }

    /// Render-ready lines, oldest first.
    pub fn visible(&self, now: Instant) -> Vec<StatusLine> {
        self.queue
            .iter()
            .filter(|e| now.saturating_duration_since(e.created) < e.ttl)
            .map(|e| StatusLine {
                id: e.id,
                kind: e.kind,
                title: e.title.clone(),
                body: e.body.clone(),
                progress: 1.0
                    - (now.saturating_duration_since(e.created).as_secs_f32()
                        / e.ttl.as_secs_f32()),
            })
            .collect()
    }

    /// Most recently posted line still on the board, regardless of TTL.
    pub fn latest(&self) -> Option<StatusLine> {
        self.queue.back().map(|e| StatusLine {
            id: e.id,
            kind: e.kind,
            title: e.title.clone(),
            body: e.body.clone(),
            progress: 1.0,
        })
    }
}
