// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Stream random frames over a link and check they all arrive intact.
//!
//! A source and a sink are connected either directly or through a skid
//! buffer. Each agent can be given a random pause probability to inject
//! backpressure. Once every frame has been received the application reports
//! how busy the link was.
//!
//! # Configuration
//!
//! Settings are merged from the following, with later sources taking
//! priority:
//!  - built-in defaults
//!  - a TOML file given with `--conf-file`
//!  - environment variables prefixed with `STROBE_` (e.g. `STROBE_FRAMES=20`)
//!  - command-line arguments
//!
//! For example:
//! ```toml
//! frames = 500
//! dut = "skid"
//! sink_pause_probability = 0.25
//! ```

pub mod config;
