// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! The receiving agent.
//!
//! A [`Sink`] samples a [`LinkSignals`] every edge, rebuilds frames from the
//! bytes that transfer and keeps them in a completed queue for test code to
//! [`recv`](Sink::recv).
//!
//! Framing errors seen on the bus are logged and counted and the sink carries
//! on with the next frame.
//!
//! # Ports
//!
//! This component drives:
//!  - `ready` of the link
//!
//! and samples:
//!  - `data`, `valid`, `sof` and `eof` of the link
//!  - the link [`Reset`]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures::select;
use strobe_engine::clock::Clock;
use strobe_engine::engine::Engine;
use strobe_engine::notify::Notify;
use strobe_engine::traits::Runnable;
use strobe_engine::types::{SimError, SimResult};
use strobe_track::entity::Entity;
use strobe_track::{debug, warn};

use crate::error::LinkError;
use crate::frame::Frame;
use crate::pause::Pause;
use crate::reset::Reset;
use crate::signals::{Beat, LinkSignals};

/// Committed values sampled by the sink on an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkInputs {
    pub reset: bool,
    pub valid: bool,
    pub ready: bool,
    pub beat: Beat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SinkStep {
    /// Value of `ready` to drive for the next edge, before the pause mask.
    pub ready: bool,

    /// The transferred byte was added to a frame.
    pub accepted: bool,

    /// The frame whose last byte transferred on this edge.
    pub completed: Option<Frame>,

    pub violation: Option<LinkError>,
}

/// Frame reassembly state of a sink.
#[derive(Clone, Debug, Default)]
pub struct SinkCore {
    partial: Option<Vec<u8>>,
}

impl SinkCore {
    /// Bytes received so far of the frame being reassembled.
    #[must_use]
    pub fn partial_len(&self) -> usize {
        self.partial.as_ref().map_or(0, Vec::len)
    }

    /// Advance one edge.
    pub fn step(&mut self, inputs: SinkInputs) -> SinkStep {
        let mut step = SinkStep::default();

        if inputs.reset {
            self.partial = None;
            return step;
        }
        step.ready = true;

        if !(inputs.valid && inputs.ready) {
            return step;
        }

        let beat = inputs.beat;
        if beat.sof {
            if let Some(dropped) = self.partial.replace(Vec::new()) {
                step.violation = Some(LinkError::ProtocolViolation(format!(
                    "start of frame with {} bytes of the previous frame outstanding",
                    dropped.len()
                )));
            }
        }

        let Some(partial) = self.partial.as_mut() else {
            step.violation = Some(LinkError::ProtocolViolation(format!(
                "byte {:#04x} outside a frame",
                beat.data
            )));
            return step;
        };
        partial.push(beat.data);
        step.accepted = true;

        if beat.eof {
            step.completed = self.partial.take().map(Frame::new);
        }
        step
    }
}

pub struct Sink {
    pub entity: Rc<Entity>,
    clock: Clock,
    signals: LinkSignals,
    reset: Reset,
    pause: Pause,
    core: RefCell<SinkCore>,
    completed: RefCell<VecDeque<Frame>>,

    /// Notified for every completed frame.
    completion: Notify,

    frames_received: Cell<usize>,
    bytes_received: Cell<usize>,
    protocol_violations: Cell<usize>,
}

impl Sink {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        signals: &LinkSignals,
        reset: &Reset,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        signals.claim_sink_side(&entity)?;
        let pause = Pause::new(&entity, &signals.ready);
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            signals: signals.clone(),
            reset: reset.clone(),
            pause,
            core: RefCell::new(SinkCore::default()),
            completed: RefCell::new(VecDeque::new()),
            completion: Notify::new(),
            frames_received: Cell::new(0),
            bytes_received: Cell::new(0),
            protocol_violations: Cell::new(0),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Take the oldest completed frame.
    pub fn recv(&self) -> Option<Frame> {
        self.completed.borrow_mut().pop_front()
    }

    /// Number of completed frames not yet taken.
    #[must_use]
    pub fn count(&self) -> usize {
        self.completed.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.borrow().is_empty()
    }

    /// Deassert `ready` from the next edge while `paused`.
    pub fn set_pause(&self, paused: bool) {
        self.pause.set(paused);
    }

    #[must_use]
    pub fn pause(&self) -> &Pause {
        &self.pause
    }

    #[must_use]
    pub fn frames_received(&self) -> usize {
        self.frames_received.get()
    }

    /// Bytes added to a frame, including those of partial frames later
    /// discarded. Bytes dropped as outside a frame are not counted.
    #[must_use]
    pub fn bytes_received(&self) -> usize {
        self.bytes_received.get()
    }

    #[must_use]
    pub fn protocol_violations(&self) -> usize {
        self.protocol_violations.get()
    }

    #[must_use]
    pub fn partial_len(&self) -> usize {
        self.core.borrow().partial_len()
    }

    /// Wait until a completed frame is available.
    ///
    /// Returns immediately if one is already queued. A `timeout_ticks` of 0
    /// waits forever.
    pub async fn wait(&self, timeout_ticks: u64) -> Result<(), LinkError> {
        if !self.is_empty() {
            return Ok(());
        }

        if timeout_ticks == 0 {
            while self.is_empty() {
                self.completion.notified().await;
            }
            return Ok(());
        }

        let mut delay = self.clock.wait_ticks(timeout_ticks);
        loop {
            select! {
                _ = self.completion.notified() => {
                    if !self.is_empty() {
                        return Ok(());
                    }
                }
                _ = delay => {
                    break;
                }
            }
        }

        if self.is_empty() {
            Err(LinkError::Timeout {
                ticks: timeout_ticks,
            })
        } else {
            Ok(())
        }
    }

    fn edge(&self) {
        let inputs = SinkInputs {
            reset: self.reset.is_asserted(),
            valid: self.signals.valid.value(),
            ready: self.signals.ready.value(),
            beat: self.signals.beat(),
        };
        let step = self.core.borrow_mut().step(inputs);
        self.pause.drive(step.ready);

        if step.accepted {
            self.bytes_received.set(self.bytes_received.get() + 1);
        }

        if let Some(violation) = step.violation {
            self.protocol_violations
                .set(self.protocol_violations.get() + 1);
            warn!(self.entity ; "{violation}");
        }

        if let Some(frame) = step.completed {
            debug!(self.entity ; "Got frame {frame}");
            self.completed.borrow_mut().push_back(frame);
            self.frames_received.set(self.frames_received.get() + 1);
            self.completion.notify();
        }
    }
}

#[async_trait(?Send)]
impl Runnable for Sink {
    async fn run(&self) -> SimResult {
        loop {
            self.clock.wait_ticks(1).await;
            self.edge();
        }
    }
}
