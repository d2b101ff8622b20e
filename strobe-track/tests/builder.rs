// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fs;

use strobe_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use strobe_track::entity::toplevel;
use strobe_track::{info, trace};

#[test]
fn log_file_tracker_respects_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.log");
    let path_str = path.to_str().unwrap();

    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: false,
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: true,
            level: log::Level::Info,
            filter_regex: ".*sink",
            file: Some(path_str),
        },
    };
    let tracker = setup_trackers(&config).unwrap();
    {
        let top = toplevel(&tracker, "top");
        let sink = strobe_track::entity::Entity::new(&top, "sink");
        let source = strobe_track::entity::Entity::new(&top, "source");
        info!(sink ; "Got frame");
        info!(source ; "Sending frame");
        trace!(sink ; "not at this level");
    }
    tracker.shutdown();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("Got frame"));
    assert!(!contents.contains("Sending frame"));
    assert!(!contents.contains("not at this level"));
}

#[test]
fn missing_file_name_is_an_error() {
    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: false,
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: true,
            ..Default::default()
        },
    };
    assert!(setup_trackers(&config).is_err());
}

#[test]
fn bad_filter_is_an_error() {
    let config = TrackersConfig {
        stdout: TrackerConfig {
            filter_regex: "(",
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: false,
            ..Default::default()
        },
    };
    assert!(setup_trackers(&config).is_err());
}
