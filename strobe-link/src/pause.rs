// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! Pause control for the link agents.
//!
//! Each agent owns a [`Pause`] that gates the handshake output it drives:
//! `valid` for a source and `ready` for a sink. The agent drives that output
//! through [`Pause::drive`] and the pause masks it. [`Pause::set`] restages the
//! gated output straight away, so a pause (or resume) is seen on the bus from
//! the next clock edge whether it is set before or after the agent's own edge.
//! A paused source also will not start a new frame.
//!
//! A [`PauseSchedule`] describes a repeating or random per-edge pause pattern
//! that can be driven onto a [`Pause`] with [`Pause::run_schedule`]:
//!
//! ```rust
//! # use strobe_link::pause::PauseSchedule;
//! let schedule = PauseSchedule::Alternate {
//!     paused_ticks: 2,
//!     running_ticks: 1,
//! };
//! let pattern: Vec<bool> = schedule.pattern().take(6).collect();
//! assert_eq!(pattern, [true, true, false, true, true, false]);
//! ```

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strobe_engine::clock::Clock;
use strobe_engine::signal::Signal;
use strobe_engine::types::SimResult;
use strobe_track::entity::Entity;
use strobe_track::value;

struct PauseState {
    entity: Rc<Entity>,
    gated: Signal<bool>,
    paused: Cell<bool>,

    /// The level the agent last asked for on `gated`.
    requested: Cell<bool>,
}

#[derive(Clone)]
pub struct Pause {
    state: Rc<PauseState>,
}

impl Pause {
    /// Create a pause under `parent` that masks `gated`.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, gated: &Signal<bool>) -> Self {
        Self {
            state: Rc::new(PauseState {
                entity: Rc::new(Entity::new(parent, "pause")),
                gated: gated.clone(),
                paused: Cell::new(false),
                requested: Cell::new(false),
            }),
        }
    }

    /// Pause (or resume) from the next edge.
    pub fn set(&self, paused: bool) {
        let state = &self.state;
        if state.paused.replace(paused) != paused {
            value!(state.entity ; u64::from(paused));
        }
        state.gated.drive(state.requested.get() && !paused);
    }

    /// Whether the agent is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.paused.get()
    }

    /// Drive `level` onto the gated output for the next edge, held low while
    /// paused.
    pub fn drive(&self, level: bool) {
        let state = &self.state;
        state.requested.set(level);
        state.gated.drive(level && !state.paused.get());
    }

    /// Drive `schedule` one edge at a time until `done()` returns true, then
    /// release the pause.
    pub async fn run_schedule<F>(&self, clock: &Clock, schedule: &PauseSchedule, done: F) -> SimResult
    where
        F: Fn() -> bool,
    {
        let mut pattern = schedule.pattern();
        while !done() {
            self.set(pattern.next().unwrap_or(false));
            clock.wait_ticks(1).await;
        }
        self.set(false);
        Ok(())
    }
}

/// A per-edge pause pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PauseSchedule {
    /// Never pause.
    #[default]
    Never,

    /// Paused for `paused_ticks` edges then running for `running_ticks`
    /// edges, repeating.
    Alternate { paused_ticks: u64, running_ticks: u64 },

    /// Paused on each edge with the given probability. The same seed always
    /// produces the same pattern.
    Random { probability: f64, seed: u64 },
}

impl PauseSchedule {
    /// An endless iterator over the pause level for each edge.
    #[must_use]
    pub fn pattern(&self) -> PausePattern {
        let rng = match self {
            PauseSchedule::Random { seed, .. } => Some(StdRng::seed_from_u64(*seed)),
            _ => None,
        };
        PausePattern {
            schedule: *self,
            tick: 0,
            rng,
        }
    }
}

pub struct PausePattern {
    schedule: PauseSchedule,
    tick: u64,
    rng: Option<StdRng>,
}

impl Iterator for PausePattern {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let tick = self.tick;
        self.tick += 1;
        let paused = match self.schedule {
            PauseSchedule::Never => false,
            PauseSchedule::Alternate {
                paused_ticks,
                running_ticks,
            } => {
                let period = paused_ticks + running_ticks;
                period != 0 && tick % period < paused_ticks
            }
            PauseSchedule::Random { probability, .. } => {
                let probability = if probability.is_nan() {
                    0.0
                } else {
                    probability.clamp(0.0, 1.0)
                };
                match self.rng.as_mut() {
                    Some(rng) => rng.gen_bool(probability),
                    None => false,
                }
            }
        };
        Some(paused)
    }
}
