// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The [`Track`] interface and the trackers behind it.

mod dev_null;
mod multi_tracker;
mod text;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::{error, fmt, io};

pub use dev_null::DevNullTracker;
pub use multi_tracker::MultiTracker;
use regex::Regex;
pub use text::TextTracker;

/// Tags the events of one [`Entity`](crate::entity::Entity).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub u64);

impl Id {
    /// The parent of the top-level entity.
    pub const NONE: Id = Id(0);
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something an entity reports to its tracker.
#[derive(Clone, Copy, Debug)]
pub enum Event<'a> {
    /// The entity was created below `parent`.
    Created {
        /// [`Id::NONE`] for the top level.
        parent: Id,
        /// Full name of the new entity.
        name: &'a str,
    },
    /// The entity was dropped.
    Destroyed {
        /// [`Id::NONE`] for the top level.
        parent: Id,
    },
    /// The entity took a new value.
    Value(u64),
    /// Simulation time is now this many ns.
    Time(f64),
    /// A log message.
    Log(log::Level, fmt::Arguments<'a>),
}

/// Implemented by everything that receives track events.
pub trait Track {
    /// Allocate the id of a new entity.
    fn new_id(&self) -> Id;

    /// Give the tracker the full name behind `id` so it can choose its level.
    fn add_entity(&self, id: Id, full_name: &str);

    /// Whether events at `level` from `id` are wanted.
    fn is_enabled(&self, id: Id, level: log::Level) -> bool;

    /// Receive `event` from `id`.
    ///
    /// Callers check [`Track::is_enabled`] first, except for
    /// [`Event::Time`] which is always sent.
    fn track(&self, id: Id, event: Event);

    /// Flush buffered output.
    fn shutdown(&self);
}

/// A [`Track`] shared by all the entities of a simulation.
pub type Tracker = Rc<dyn Track>;

/// A tracker could not be built from its configuration.
#[derive(Debug)]
pub struct TrackConfigError(pub String);

impl fmt::Display for TrackConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track config error: {}", self.0)
    }
}

impl error::Error for TrackConfigError {}

/// A [`TextTracker`] on `stdout` at `level`.
#[must_use]
pub fn stdout_tracker(level: log::Level) -> Tracker {
    Rc::new(TextTracker::new(
        Levels::new(level),
        Box::new(io::BufWriter::new(io::stdout())),
    ))
}

/// A tracker that drops everything.
#[must_use]
pub fn dev_null_tracker() -> Tracker {
    Rc::new(DevNullTracker)
}

/// Per-entity levels and id allocation for a tracker.
///
/// Full names are matched against the filters once, as entities are added.
/// The first matching filter sets the level, otherwise the default applies.
pub struct Levels {
    default: log::Level,
    filters: Vec<(Regex, log::Level)>,
    overridden: RefCell<HashMap<Id, log::Level>>,
    next_id: Cell<u64>,
}

impl Levels {
    /// All entities at `default` until filters are added.
    #[must_use]
    pub fn new(default: log::Level) -> Self {
        Self {
            default,
            filters: Vec::new(),
            overridden: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Put entities whose full name matches `regex` at `level`.
    ///
    /// ```rust
    /// use strobe_track::tracker::Levels;
    ///
    /// let levels = Levels::new(log::Level::Warn)
    ///     .with_filter(".*sink", log::Level::Trace)
    ///     .unwrap();
    /// assert_eq!(levels.level_for("top::bench::sink"), log::Level::Trace);
    /// ```
    pub fn with_filter(mut self, regex: &str, level: log::Level) -> Result<Self, TrackConfigError> {
        let regex = Regex::new(regex)
            .map_err(|e| TrackConfigError(format!("Failed to parse regex {regex}:\n{e}\n")))?;
        self.filters.push((regex, level));
        Ok(self)
    }

    /// The level an entity called `full_name` would get.
    #[must_use]
    pub fn level_for(&self, full_name: &str) -> log::Level {
        self.filters
            .iter()
            .find(|(regex, _)| regex.is_match(full_name))
            .map_or(self.default, |(_, level)| *level)
    }

    fn new_id(&self) -> Id {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Id(id)
    }

    fn add_entity(&self, id: Id, full_name: &str) {
        let level = self.level_for(full_name);
        if level != self.default {
            self.overridden.borrow_mut().insert(id, level);
        }
    }

    fn is_enabled(&self, id: Id, level: log::Level) -> bool {
        let entity_level = self
            .overridden
            .borrow()
            .get(&id)
            .copied()
            .unwrap_or(self.default);
        level <= entity_level
    }
}
