// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::Cell;

use crate::tracker::{Event, Id, Track, Tracker};

/// Forwards each event to every tracker that wants it.
///
/// Ids are allocated here so that all the trackers agree on them.
pub struct MultiTracker {
    trackers: Vec<Tracker>,
    next_id: Cell<u64>,
}

impl MultiTracker {
    /// Fan out to `trackers`.
    #[must_use]
    pub fn new(trackers: Vec<Tracker>) -> Self {
        Self {
            trackers,
            next_id: Cell::new(1),
        }
    }
}

impl Track for MultiTracker {
    fn new_id(&self) -> Id {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Id(id)
    }

    fn add_entity(&self, id: Id, full_name: &str) {
        for tracker in &self.trackers {
            tracker.add_entity(id, full_name);
        }
    }

    fn is_enabled(&self, id: Id, level: log::Level) -> bool {
        self.trackers
            .iter()
            .any(|tracker| tracker.is_enabled(id, level))
    }

    fn track(&self, id: Id, event: Event) {
        let level = match event {
            // Every tracker stamps its own log lines
            Event::Time(_) => None,
            Event::Log(level, _) => Some(level),
            _ => Some(log::Level::Trace),
        };
        for tracker in &self.trackers {
            if level.is_none_or(|level| tracker.is_enabled(id, level)) {
                tracker.track(id, event);
            }
        }
    }

    fn shutdown(&self) {
        for tracker in &self.trackers {
            tracker.shutdown();
        }
    }
}
