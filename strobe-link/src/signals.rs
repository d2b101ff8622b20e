// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! The handshake signal set connecting a source to a sink.
//!
//! Inside the models every control signal is active-high:
//!
//! | signal  | driven by | meaning                               |
//! |---------|-----------|---------------------------------------|
//! | `data`  | source    | the byte being presented              |
//! | `valid` | source    | `data` holds a byte of a frame        |
//! | `ready` | sink      | the sink accepts a byte on this edge  |
//! | `sof`   | source    | `data` is the first byte of a frame   |
//! | `eof`   | source    | `data` is the last byte of a frame    |
//!
//! A byte transfers on an edge where both `valid` and `ready` are asserted.
//!
//! The physical LocalLink convention uses active-low `sof_n`, `eof_n`,
//! `src_rdy_n` and `dst_rdy_n`. [`LinkPins`] provides that view for models
//! written against the pins, translating at the boundary.

use std::rc::Rc;

use strobe_engine::clock::Clock;
use strobe_engine::signal::Signal;
use strobe_engine::types::SimResult;
use strobe_track::entity::Entity;

/// The data and framing markers presented on one edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Beat {
    pub data: u8,
    pub sof: bool,
    pub eof: bool,
}

#[derive(Clone)]
pub struct LinkSignals {
    pub entity: Rc<Entity>,
    pub data: Signal<u8>,
    pub valid: Signal<bool>,
    pub ready: Signal<bool>,
    pub sof: Signal<bool>,
    pub eof: Signal<bool>,
}

impl LinkSignals {
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str, clock: &Clock) -> Self {
        let entity = Rc::new(Entity::new(parent, name));
        Self {
            data: Signal::new(&entity, "data", clock, 0),
            valid: Signal::new(&entity, "valid", clock, false),
            ready: Signal::new(&entity, "ready", clock, false),
            sof: Signal::new(&entity, "sof", clock, false),
            eof: Signal::new(&entity, "eof", clock, false),
            entity,
        }
    }

    /// The committed data and markers.
    #[must_use]
    pub fn beat(&self) -> Beat {
        Beat {
            data: self.data.value(),
            sof: self.sof.value(),
            eof: self.eof.value(),
        }
    }

    /// Whether a byte transfers on the current edge.
    #[must_use]
    pub fn is_transfer(&self) -> bool {
        self.valid.value() && self.ready.value()
    }

    /// Drive all the source-side signals for the next edge.
    pub fn drive_source(&self, valid: bool, beat: Beat) {
        self.valid.drive(valid);
        self.drive_beat(beat);
    }

    /// Drive `data`, `sof` and `eof` for the next edge.
    pub fn drive_beat(&self, beat: Beat) {
        self.data.drive(beat.data);
        self.sof.drive(beat.sof);
        self.eof.drive(beat.eof);
    }

    /// Claim `data`, `valid`, `sof` and `eof` for a single driver.
    pub fn claim_source_side(&self, driver: &Entity) -> SimResult {
        self.data.claim_driver(driver)?;
        self.valid.claim_driver(driver)?;
        self.sof.claim_driver(driver)?;
        self.eof.claim_driver(driver)
    }

    /// Claim `ready` for a single driver.
    pub fn claim_sink_side(&self, driver: &Entity) -> SimResult {
        self.ready.claim_driver(driver)
    }
}

/// Active-low view of a [`LinkSignals`].
#[derive(Clone)]
pub struct LinkPins {
    signals: LinkSignals,
}

impl LinkPins {
    #[must_use]
    pub fn new(signals: &LinkSignals) -> Self {
        Self {
            signals: signals.clone(),
        }
    }

    #[must_use]
    pub fn data(&self) -> u8 {
        self.signals.data.value()
    }

    #[must_use]
    pub fn sof_n(&self) -> bool {
        !self.signals.sof.value()
    }

    #[must_use]
    pub fn eof_n(&self) -> bool {
        !self.signals.eof.value()
    }

    #[must_use]
    pub fn src_rdy_n(&self) -> bool {
        !self.signals.valid.value()
    }

    #[must_use]
    pub fn dst_rdy_n(&self) -> bool {
        !self.signals.ready.value()
    }

    pub fn drive_data(&self, data: u8) {
        self.signals.data.drive(data);
    }

    pub fn drive_sof_n(&self, sof_n: bool) {
        self.signals.sof.drive(!sof_n);
    }

    pub fn drive_eof_n(&self, eof_n: bool) {
        self.signals.eof.drive(!eof_n);
    }

    pub fn drive_src_rdy_n(&self, src_rdy_n: bool) {
        self.signals.valid.drive(!src_rdy_n);
    }

    pub fn drive_dst_rdy_n(&self, dst_rdy_n: bool) {
        self.signals.ready.drive(!dst_rdy_n);
    }

    #[must_use]
    pub fn signals(&self) -> &LinkSignals {
        &self.signals
    }
}
