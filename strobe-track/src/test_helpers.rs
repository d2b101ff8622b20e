// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! Check what the tracking macros emit.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;

use regex::Regex;

use crate::tracker::{Levels, TextTracker};
use crate::{Event, Id, Track, Tracker, Writer};

/// Records every event as a line of text, with all entities enabled.
pub struct TestTracker {
    lines: RefCell<Vec<String>>,
    next_id: Cell<u64>,
}

impl TestTracker {
    /// Hand out ids from `first_id`.
    #[must_use]
    pub fn new(first_id: u64) -> Self {
        Self {
            lines: RefCell::new(Vec::new()),
            next_id: Cell::new(first_id),
        }
    }
}

impl Track for TestTracker {
    fn new_id(&self) -> Id {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Id(id)
    }

    fn add_entity(&self, _id: Id, _full_name: &str) {}

    fn is_enabled(&self, _id: Id, _level: log::Level) -> bool {
        true
    }

    fn track(&self, id: Id, event: Event) {
        let line = match event {
            Event::Created { parent, name } => format!("{parent}: created {id}, {name}"),
            Event::Destroyed { parent } => format!("{parent}: destroyed {id}"),
            Event::Value(value) => format!("{id}: value {value:#x}"),
            Event::Time(time_ns) => format!("{id}: set time {time_ns:.1}ns"),
            Event::Log(level, msg) => format!("{id}:{level}: {msg}"),
        };
        println!("{line}");
        self.lines.borrow_mut().push(line);
    }

    fn shutdown(&self) {}
}

/// Create a [`TestTracker`] and the same tracker as a shared [`Tracker`].
///
/// ```
/// use strobe_track::test_helpers;
///
/// let (test_tracker, tracker) = strobe_track::test_init!(10);
/// let top = strobe_track::entity::toplevel(&tracker, "top");
/// test_helpers::check_and_clear(&test_tracker, &["0: created 10, top"]);
/// ```
#[macro_export]
macro_rules! test_init {
    ($first_id:expr) => {{
        let test_tracker = std::rc::Rc::new($crate::test_helpers::TestTracker::new($first_id));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Assert the lines recorded since the last check match `expected`, one
/// regular expression per line, then forget them.
///
/// # Panics
///
/// Panics if the number of lines differs or a line does not match.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let mut lines = tracker.lines.borrow_mut();
    assert_eq!(expected.len(), lines.len(), "{expected:?} vs {lines:?}");
    for (pattern, line) in expected.iter().zip(lines.iter()) {
        let re = Regex::new(pattern).unwrap();
        assert!(re.is_match(line), "{line:?} does not match {pattern:?}");
    }
    lines.clear();
}

/// A `Debug` level [`TextTracker`] writing to `tracks/<test file stem>.log`.
///
/// # Panics
///
/// Panics if the log file cannot be created.
#[must_use]
pub fn create_tracker(test_file: &str) -> Tracker {
    const FOLDER: &str = "tracks";
    fs::create_dir_all(FOLDER).unwrap();

    let stem = Path::new(test_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("test");
    let file = fs::File::create(format!("{FOLDER}/{stem}.log")).unwrap();
    let writer: Writer = Box::new(BufWriter::new(file));
    Rc::new(TextTracker::new(Levels::new(log::Level::Debug), writer))
}
