// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Build the trackers a simulation run asks for.

use std::io::BufWriter;
use std::rc::Rc;
use std::{fs, io};

use crate::tracker::{Levels, MultiTracker, TextTracker, TrackConfigError};
use crate::{Tracker, Writer};

/// Options for one text tracker.
pub struct TrackerConfig<'a> {
    /// Whether this tracker is built at all.
    pub enable: bool,

    /// Level of the entities `filter_regex` matches, or of every entity
    /// when it is empty.
    pub level: log::Level,

    /// Entities not matching a non-empty filter only report errors.
    pub filter_regex: &'a str,

    /// Output file, required for a log-file tracker.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

/// The stdout and log-file trackers of a run.
pub struct TrackersConfig<'a> {
    /// Tracker printing to stdout.
    pub stdout: TrackerConfig<'a>,

    /// Tracker writing to [`TrackerConfig::file`].
    pub log_file: TrackerConfig<'a>,
}

fn levels(config: &TrackerConfig) -> Result<Levels, TrackConfigError> {
    if config.filter_regex.is_empty() {
        Ok(Levels::new(config.level))
    } else {
        Levels::new(log::Level::Error).with_filter(config.filter_regex, config.level)
    }
}

fn text_tracker(config: &TrackerConfig, writer: Writer) -> Result<Tracker, TrackConfigError> {
    Ok(Rc::new(TextTracker::new(levels(config)?, writer)))
}

fn stdout_writer() -> Writer {
    Box::new(BufWriter::new(io::stdout()))
}

fn file_writer(config: &TrackerConfig) -> Result<Writer, TrackConfigError> {
    let Some(filename) = config.file else {
        return Err(TrackConfigError(
            "log file tracker enabled without a file name".to_string(),
        ));
    };
    let file = fs::File::create(filename)
        .map_err(|e| TrackConfigError(format!("Failed to create {filename}: {e}")))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Build the enabled trackers, combined when there is more than one.
///
/// With nothing enabled, returns a stdout tracker at `Warn`.
pub fn setup_trackers(config: &TrackersConfig) -> Result<Tracker, TrackConfigError> {
    let mut trackers = Vec::new();
    if config.stdout.enable {
        trackers.push(text_tracker(&config.stdout, stdout_writer())?);
    }
    if config.log_file.enable {
        trackers.push(text_tracker(&config.log_file, file_writer(&config.log_file)?)?);
    }

    if trackers.len() > 1 {
        return Ok(Rc::new(MultiTracker::new(trackers)));
    }
    match trackers.pop() {
        Some(tracker) => Ok(tracker),
        None => text_tracker(&TrackerConfig::default(), stdout_writer()),
    }
}
