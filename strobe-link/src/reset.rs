// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! Synchronous active-high reset shared by the agents on a link.

use std::rc::Rc;

use strobe_engine::clock::Clock;
use strobe_engine::signal::Signal;
use strobe_track::entity::Entity;

#[derive(Clone)]
pub struct Reset {
    signal: Signal<bool>,
}

impl Reset {
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str, clock: &Clock) -> Self {
        Self {
            signal: Signal::new(parent, name, clock, false),
        }
    }

    /// Assert reset from the next edge.
    pub fn assert(&self) {
        self.signal.drive(true);
    }

    /// Release reset from the next edge.
    pub fn release(&self) {
        self.signal.drive(false);
    }

    #[must_use]
    pub fn is_asserted(&self) -> bool {
        self.signal.value()
    }

    /// Hold reset for exactly `ticks` edges. Returns once the release has
    /// been staged so the next edge is the first one out of reset.
    pub async fn pulse(&self, ticks: u64) {
        self.assert();
        self.signal.clock().wait_ticks(ticks).await;
        self.release();
    }

    #[must_use]
    pub fn signal(&self) -> &Signal<bool> {
        &self.signal
    }
}
