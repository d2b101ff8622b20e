// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! Logging and tracing for the strobe models.
//!
//! Every model part owns an [`Entity`](entity::Entity). Entities form a
//! `::`-separated hierarchy (`top::bench::sink`) and send their events to a
//! shared [`Tracker`]. Two kinds of event are tracked:
//!
//!  - _log_ messages, emitted with [`trace!`], [`debug!`], [`info!`],
//!    [`warn!`] and [`error!`] and filtered per entity by level
//!  - _trace_ events: entities being created and destroyed, signals taking
//!    new values ([`value!`]) and time advancing ([`set_time!`])
//!
//! A message is only formatted when its entity is enabled at its level.
//!
//! ```rust
//! use strobe_track::entity::{Entity, toplevel};
//! use strobe_track::tracker::dev_null_tracker;
//! use strobe_track::warn;
//!
//! let top = toplevel(&dev_null_tracker(), "top");
//! let sink = Entity::new(&top, "sink");
//! assert_eq!(sink.full_name(), "top::sink");
//! warn!(sink ; "byte {:#04x} outside a frame", 0x55);
//! ```

#![warn(missing_docs)]

pub use log;

pub mod builder;
pub mod entity;
pub mod test_helpers;
pub mod tracker;

pub use tracker::{Event, Id, Track, Tracker};

/// Where text trackers write their output.
pub type Writer = Box<dyn std::io::Write>;

#[doc(hidden)]
#[macro_export]
macro_rules! track_log {
    ($entity:expr, $level:expr, $($arg:tt)+) => {{
        let entity = &$entity;
        if entity.is_enabled($level) {
            entity.track($crate::Event::Log($level, format_args!($($arg)+)));
        }
    }};
}

/// Log at `Trace` level: `trace!(entity ; "format", args...)`.
#[macro_export]
macro_rules! trace {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::track_log!($entity, $crate::log::Level::Trace, $($arg)+)
    };
}

/// Log at `Debug` level.
#[macro_export]
macro_rules! debug {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::track_log!($entity, $crate::log::Level::Debug, $($arg)+)
    };
}

/// Log at `Info` level.
#[macro_export]
macro_rules! info {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::track_log!($entity, $crate::log::Level::Info, $($arg)+)
    };
}

/// Log at `Warn` level.
#[macro_export]
macro_rules! warn {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::track_log!($entity, $crate::log::Level::Warn, $($arg)+)
    };
}

/// Log at `Error` level.
#[macro_export]
macro_rules! error {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::track_log!($entity, $crate::log::Level::Error, $($arg)+)
    };
}

/// Trace an entity (usually a signal) taking a new value.
#[macro_export]
macro_rules! value {
    ($entity:expr ; $value:expr) => {{
        let entity = &$entity;
        if entity.is_enabled($crate::log::Level::Trace) {
            entity.track($crate::Event::Value($value));
        }
    }};
}

/// Tell the trackers that simulation time has moved on.
///
/// Always sent: trackers need it to timestamp their log lines.
#[macro_export]
macro_rules! set_time {
    ($entity:expr ; $time_ns:expr) => {
        $entity.track($crate::Event::Time($time_ns))
    };
}
