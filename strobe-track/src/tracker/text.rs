// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

use std::cell::{Cell, RefCell};
use std::io::Write;

use crate::Writer;
use crate::tracker::{Event, Id, Levels, Track};

/// Writes one line of text per event.
///
/// Log lines are prefixed with the latest simulation time seen.
pub struct TextTracker {
    levels: Levels,
    now_ns: Cell<f64>,
    writer: RefCell<Writer>,
}

impl TextTracker {
    /// Write the events `levels` allows to `writer`.
    #[must_use]
    pub fn new(levels: Levels, writer: Writer) -> Self {
        Self {
            levels,
            now_ns: Cell::new(0.0),
            writer: RefCell::new(writer),
        }
    }
}

impl Track for TextTracker {
    fn new_id(&self) -> Id {
        self.levels.new_id()
    }

    fn add_entity(&self, id: Id, full_name: &str) {
        self.levels.add_entity(id, full_name);
    }

    fn is_enabled(&self, id: Id, level: log::Level) -> bool {
        self.levels.is_enabled(id, level)
    }

    fn track(&self, id: Id, event: Event) {
        let mut writer = self.writer.borrow_mut();
        // Failed writes are ignored
        let _ = match event {
            Event::Created { parent, name } => writeln!(writer, "{parent}: created {id}, {name}"),
            Event::Destroyed { parent } => writeln!(writer, "{parent}: destroyed {id}"),
            Event::Value(value) => writeln!(writer, "{id}: value {value:#x}"),
            Event::Time(time_ns) => {
                if time_ns > self.now_ns.get() {
                    self.now_ns.set(time_ns);
                }
                if self.levels.is_enabled(id, log::Level::Trace) {
                    writeln!(writer, "{id}: set time to {time_ns:.1}ns")
                } else {
                    Ok(())
                }
            }
            Event::Log(level, msg) => {
                writeln!(writer, "{:.1}ns {id}:{level}: {msg}", self.now_ns.get())
            }
        };
    }

    fn shutdown(&self) {
        let _ = self.writer.borrow_mut().flush();
    }
}
