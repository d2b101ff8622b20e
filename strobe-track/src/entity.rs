// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Named, hierarchical simulation entities.
//!
//! Every part of a model holds an [`Entity`]. Its full name
//! (`top::bench::sink`) selects the level its tracker applies, and its [`Id`]
//! tags every event it sends.

use std::fmt;
use std::rc::Rc;

use crate::{Event, Id, Tracker};

/// A node in the simulation hierarchy.
pub struct Entity {
    full_name: String,
    parent: Option<Rc<Entity>>,

    /// Tags the events this entity sends.
    pub id: Id,

    tracker: Tracker,
}

impl Entity {
    /// Create a child of `parent`.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        let full_name = format!("{}::{name}", parent.full_name);
        Self::register(Some(parent.clone()), full_name, &parent.tracker)
    }

    fn register(parent: Option<Rc<Entity>>, full_name: String, tracker: &Tracker) -> Self {
        let id = tracker.new_id();
        tracker.add_entity(id, &full_name);
        let entity = Self {
            full_name,
            parent,
            id,
            tracker: tracker.clone(),
        };
        if entity.is_enabled(log::Level::Trace) {
            entity.track(Event::Created {
                parent: entity.parent_id(),
                name: &entity.full_name,
            });
        }
        entity
    }

    /// The `::`-joined names from the top level down to this entity.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    fn parent_id(&self) -> Id {
        self.parent.as_ref().map_or(Id::NONE, |parent| parent.id)
    }

    /// Whether the tracker wants events at `level` from this entity.
    #[must_use]
    pub fn is_enabled(&self, level: log::Level) -> bool {
        self.tracker.is_enabled(self.id, level)
    }

    /// Send `event` to the tracker.
    pub fn track(&self, event: Event) {
        self.tracker.track(self.id, event);
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        if self.is_enabled(log::Level::Trace) {
            self.track(Event::Destroyed {
                parent: self.parent_id(),
            });
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("full_name", &self.full_name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Create the top-level entity, the only one without a parent.
pub fn toplevel(tracker: &Tracker, name: &str) -> Rc<Entity> {
    Rc::new(Entity::register(None, name.to_string(), tracker))
}
