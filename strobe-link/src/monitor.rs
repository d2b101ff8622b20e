// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! Monitor for a link
//!
//! The link monitor samples the committed handshake every edge and keeps
//! counts of transfer, stall and idle edges along with the span of every
//! frame that completes. The length of each frame is emitted as a value
//! event on its `frame_len` entity.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use strobe_engine::clock::Clock;
use strobe_engine::engine::Engine;
use strobe_engine::traits::Runnable;
use strobe_engine::types::SimResult;
use strobe_track::entity::Entity;
use strobe_track::value;

use crate::reset::Reset;
use crate::signals::LinkSignals;

/// The edges over which one frame transferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSpan {
    /// Tick of the start-of-frame byte.
    pub first_tick: u64,
    /// Tick of the end-of-frame byte.
    pub last_tick: u64,
    pub len: usize,
}

impl FrameSpan {
    /// Number of edges from first to last byte inclusive.
    #[must_use]
    pub fn edges(&self) -> u64 {
        self.last_tick - self.first_tick + 1
    }
}

pub struct LinkMonitor {
    pub entity: Rc<Entity>,
    len_entity: Rc<Entity>,
    clock: Clock,
    signals: LinkSignals,
    reset: Reset,
    transfers: Cell<u64>,
    stall_ticks: Cell<u64>,
    idle_ticks: Cell<u64>,
    current: Cell<Option<(u64, usize)>>,
    spans: RefCell<Vec<FrameSpan>>,
}

impl LinkMonitor {
    #[must_use]
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        signals: &LinkSignals,
        reset: &Reset,
    ) -> Rc<Self> {
        let entity = Rc::new(Entity::new(parent, name));
        let len_entity = Rc::new(Entity::new(&entity, "frame_len"));
        let rc_self = Rc::new(Self {
            entity,
            len_entity,
            clock: clock.clone(),
            signals: signals.clone(),
            reset: reset.clone(),
            transfers: Cell::new(0),
            stall_ticks: Cell::new(0),
            idle_ticks: Cell::new(0),
            current: Cell::new(None),
            spans: RefCell::new(Vec::new()),
        });
        engine.register(rc_self.clone());
        rc_self
    }

    /// Edges on which a byte transferred.
    #[must_use]
    pub fn transfers(&self) -> u64 {
        self.transfers.get()
    }

    /// Edges on which `valid` was held without `ready`.
    #[must_use]
    pub fn stall_ticks(&self) -> u64 {
        self.stall_ticks.get()
    }

    /// Edges out of reset with `valid` low.
    #[must_use]
    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks.get()
    }

    #[must_use]
    pub fn frame_spans(&self) -> Vec<FrameSpan> {
        self.spans.borrow().clone()
    }

    /// Idle edges between consecutive frames.
    #[must_use]
    pub fn gaps(&self) -> Vec<u64> {
        self.spans
            .borrow()
            .windows(2)
            .map(|pair| pair[1].first_tick - pair[0].last_tick - 1)
            .collect()
    }

    fn sample(&self) {
        if self.reset.is_asserted() {
            self.current.set(None);
            return;
        }

        let valid = self.signals.valid.value();
        let ready = self.signals.ready.value();
        match (valid, ready) {
            (true, true) => {}
            (true, false) => {
                self.stall_ticks.set(self.stall_ticks.get() + 1);
                return;
            }
            (false, _) => {
                self.idle_ticks.set(self.idle_ticks.get() + 1);
                return;
            }
        }

        self.transfers.set(self.transfers.get() + 1);
        let tick = self.clock.tick_now();
        let beat = self.signals.beat();
        let (first_tick, len) = match self.current.get() {
            Some(current) if !beat.sof => current,
            _ => (tick, 0),
        };
        let len = len + 1;

        if beat.eof {
            self.current.set(None);
            self.spans.borrow_mut().push(FrameSpan {
                first_tick,
                last_tick: tick,
                len,
            });
            value!(self.len_entity ; len as u64);
        } else {
            self.current.set(Some((first_tick, len)));
        }
    }
}

#[async_trait(?Send)]
impl Runnable for LinkMonitor {
    async fn run(&self) -> SimResult {
        loop {
            self.clock.wait_ticks(1).await;
            self.sample();
        }
    }
}
