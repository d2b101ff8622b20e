// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! The simulation engine underneath the strobe link models.
//!
//! This library provides a single-threaded [executor](crate::executor) of
//! `async` tasks driven by one [clock](crate::clock), with
//! [signals](crate::signal) that model registered wires and a
//! [`Notify`](crate::notify::Notify) for waiting on model events.
//!
//! # Time and signals
//!
//! Tasks wait on clock edges using [`Clock::wait_ticks`]. Values written to a
//! [`Signal`] during an edge are staged and only become visible once the
//! clock advances to its next edge. Every task woken on that edge therefore
//! sees the same committed values regardless of the order in which the tasks
//! run.
//!
//! [`Clock::wait_ticks`]: crate::clock::Clock::wait_ticks
//! [`Signal`]: crate::signal::Signal
//!
//! # Foreground and background tasks
//!
//! Components registered with the [`Engine`](crate::engine::Engine) run as
//! background tasks: they typically loop forever reacting to clock edges.
//! A simulation finishes once every foreground task (such as a test
//! sequence spawned with [`Engine::spawn`](crate::engine::Engine::spawn)) has
//! completed.
//!
//! # Simple Application
//!
//! ```rust
//! use strobe_engine::engine::Engine;
//! use strobe_engine::run_simulation;
//! use strobe_track::tracker::dev_null_tracker;
//!
//! let mut engine = Engine::new(&dev_null_tracker());
//! let clock = engine.clock_mhz(125.0).unwrap();
//! {
//!     let clock = clock.clone();
//!     engine.spawn(async move {
//!         clock.wait_ticks(4).await;
//!         Ok(())
//!     });
//! }
//! run_simulation!(engine);
//! assert_eq!(clock.time_now_ns(), 32.0);
//! ```

pub mod clock;
pub mod engine;
pub mod executor;
pub mod notify;
pub mod signal;
pub mod test_helpers;
pub mod traits;
pub mod types;

#[macro_export]
/// Run the simulation, asserting it either succeeds or fails with the
/// expected error message.
macro_rules! run_simulation {
    ($engine:ident) => {
        $engine.run().unwrap();
    };
    ($engine:ident, $expect:expr) => {
        match $engine.run() {
            Ok(()) => panic!("Expected an error!"),
            Err(e) => assert_eq!(format!("{e}").as_str(), $expect),
        }
    };
}
