// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Bus-functional models for a byte-wide LocalLink style stream.
//!
//! A [`Source`](crate::source::Source) streams queued
//! [`Frame`](crate::frame::Frame)s onto a set of
//! [`LinkSignals`](crate::signals::LinkSignals) and a
//! [`Sink`](crate::sink::Sink) rebuilds frames from what transfers. A byte
//! transfers on every edge where `valid` and `ready` are both asserted, with
//! `sof` and `eof` marking the first and last byte of each frame.
//!
//! Either agent can be paused to inject backpressure:
//!  - a paused source withholds `valid`
//!  - a paused sink withholds `ready`
//!
//! # Sending a frame
//!
//! ```rust
//! use strobe_engine::run_simulation;
//! use strobe_engine::test_helpers::start_test;
//! use strobe_link::source::SourceConfig;
//! use strobe_link::test_helpers::LinkBench;
//!
//! let mut engine = start_test(file!());
//! let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
//! {
//!     let reset = bench.reset.clone();
//!     let source = bench.source.clone();
//!     let sink = bench.sink.clone();
//!     engine.spawn(async move {
//!         reset.pulse(2).await;
//!         source.enqueue(&[0xda, 0x01, 0x02, 0x10])?;
//!         sink.wait(100).await?;
//!         assert_eq!(sink.recv().unwrap().bytes(), &[0xda, 0x01, 0x02, 0x10]);
//!         assert!(sink.is_empty());
//!         Ok(())
//!     });
//! }
//! run_simulation!(engine);
//! ```

pub mod error;
pub mod frame;
pub mod monitor;
pub mod pause;
pub mod reset;
pub mod signals;
pub mod sink;
pub mod skid_buffer;
pub mod source;
pub mod test_helpers;
