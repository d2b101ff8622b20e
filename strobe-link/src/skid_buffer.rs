// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! A two-entry registered slice used as a device under test.
//!
//! The skid buffer sits between two links and is modelled on the pins, so it
//! sees the active-low LocalLink convention. With a sink that is always ready
//! it forwards one byte per edge with a single edge of latency. When the
//! downstream stalls it deasserts ready upstream once both entries are full.
//!
//! # Ports
//!
//! This component drives:
//!  - `dst_rdy_n` of the upstream link
//!  - `data`, `src_rdy_n`, `sof_n` and `eof_n` of the downstream link

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use strobe_engine::clock::Clock;
use strobe_engine::engine::Engine;
use strobe_engine::traits::Runnable;
use strobe_engine::types::{SimError, SimResult};
use strobe_track::entity::Entity;
use strobe_track::trace;

use crate::reset::Reset;
use crate::signals::{Beat, LinkPins, LinkSignals};

const CAPACITY: usize = 2;

pub struct SkidBuffer {
    pub entity: Rc<Entity>,
    clock: Clock,
    upstream: LinkPins,
    downstream: LinkPins,
    reset: Reset,
    entries: RefCell<VecDeque<Beat>>,
}

impl SkidBuffer {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        upstream: &LinkSignals,
        downstream: &LinkSignals,
        reset: &Reset,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        upstream.claim_sink_side(&entity)?;
        downstream.claim_source_side(&entity)?;
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            upstream: LinkPins::new(upstream),
            downstream: LinkPins::new(downstream),
            reset: reset.clone(),
            entries: RefCell::new(VecDeque::with_capacity(CAPACITY)),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Number of bytes held.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.entries.borrow().len()
    }

    fn drive_idle(&self) {
        self.upstream.drive_dst_rdy_n(true);
        self.downstream.drive_src_rdy_n(true);
        self.downstream.drive_sof_n(true);
        self.downstream.drive_eof_n(true);
    }

    fn edge(&self) {
        let mut entries = self.entries.borrow_mut();
        if self.reset.is_asserted() {
            entries.clear();
            self.drive_idle();
            return;
        }

        let down = &self.downstream;
        if !down.src_rdy_n() && !down.dst_rdy_n() {
            entries.pop_front();
        }

        let up = &self.upstream;
        if !up.src_rdy_n() && !up.dst_rdy_n() {
            let beat = Beat {
                data: up.data(),
                sof: !up.sof_n(),
                eof: !up.eof_n(),
            };
            trace!(self.entity ; "Accepted {:#04x}", beat.data);
            entries.push_back(beat);
        }

        match entries.front() {
            Some(beat) => {
                down.drive_data(beat.data);
                down.drive_sof_n(!beat.sof);
                down.drive_eof_n(!beat.eof);
                down.drive_src_rdy_n(false);
            }
            None => {
                down.drive_sof_n(true);
                down.drive_eof_n(true);
                down.drive_src_rdy_n(true);
            }
        }
        up.drive_dst_rdy_n(entries.len() >= CAPACITY);
    }
}

#[async_trait(?Send)]
impl Runnable for SkidBuffer {
    async fn run(&self) -> SimResult {
        loop {
            self.clock.wait_ticks(1).await;
            self.edge();
        }
    }
}
