// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! The transmitting agent.
//!
//! A [`Source`] owns a queue of pending [`Frame`]s and streams them onto a
//! [`LinkSignals`] one byte per edge, honouring the sink's `ready` and its
//! own [`Pause`].
//!
//! The per-edge behaviour lives in [`SourceCore::step`], a plain function of
//! the committed inputs that returns the outputs to drive for the next edge.
//! The [`Source`] component just samples the bus, calls `step` and drives the
//! result, with `valid` gated by its [`Pause`].
//!
//! # Ports
//!
//! This component drives:
//!  - `data`, `valid`, `sof` and `eof` of the link
//!
//! and samples:
//!  - `ready` of the link
//!  - the link [`Reset`]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strobe_engine::clock::Clock;
use strobe_engine::engine::Engine;
use strobe_engine::traits::Runnable;
use strobe_engine::types::{SimError, SimResult};
use strobe_track::entity::Entity;
use strobe_track::{debug, trace};

use crate::error::LinkError;
use crate::frame::Frame;
use crate::pause::Pause;
use crate::reset::Reset;
use crate::signals::{Beat, LinkSignals};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Start the next pending frame on the same edge that the previous frame's
    /// last byte transfers. When false one idle edge separates frames.
    pub zero_gap: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { zero_gap: true }
    }
}

/// Committed values sampled by the source on an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceInputs {
    pub reset: bool,
    pub valid: bool,
    pub ready: bool,
    pub pause: bool,
}

/// Values to drive for the next edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceOutputs {
    /// A beat is loaded. The pause mask is applied on top of this.
    pub valid: bool,
    pub beat: Beat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStep {
    pub outputs: SourceOutputs,

    /// A frame was taken from the pending queue on this edge.
    pub started: bool,

    /// The last byte of a frame transferred on this edge.
    pub finished: bool,
}

/// In-flight state of a source.
#[derive(Clone, Debug, Default)]
pub struct SourceCore {
    frame: Option<Frame>,

    /// Index of the next byte of `frame` to load.
    next: usize,

    /// The beat being presented (or held while paused or stalled).
    loaded: Option<Beat>,

    /// Last data driven. Held while `valid` is low.
    data: u8,
}

impl SourceCore {
    /// Whether a frame is being transmitted.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.frame.is_some()
    }

    /// The frame being transmitted.
    #[must_use]
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    fn next_beat(&mut self) -> Option<Beat> {
        let frame = self.frame.as_ref()?;
        let data = *frame.get(self.next)?;
        let beat = Beat {
            data,
            sof: self.next == 0,
            eof: self.next + 1 == frame.len(),
        };
        self.next += 1;
        Some(beat)
    }

    fn start(&mut self, frame: Frame) {
        self.frame = Some(frame);
        self.next = 0;
        self.loaded = self.next_beat();
    }

    /// Advance one edge.
    pub fn step(
        &mut self,
        config: &SourceConfig,
        inputs: SourceInputs,
        pending: &mut VecDeque<Frame>,
    ) -> SourceStep {
        let mut step = SourceStep::default();

        if inputs.reset {
            *self = SourceCore::default();
            return step;
        }

        if inputs.valid && inputs.ready {
            if let Some(sent) = self.loaded.take() {
                if sent.eof {
                    self.frame = None;
                    step.finished = true;
                }
            }
        }

        if self.loaded.is_none() {
            self.loaded = self.next_beat();
        }

        let may_start = !inputs.pause && (config.zero_gap || !step.finished);
        if self.loaded.is_none() && may_start {
            if let Some(frame) = pending.pop_front() {
                self.start(frame);
                step.started = true;
            }
        }

        if let Some(beat) = self.loaded {
            self.data = beat.data;
            step.outputs = SourceOutputs { valid: true, beat };
        } else {
            step.outputs = SourceOutputs {
                valid: false,
                beat: Beat {
                    data: self.data,
                    sof: false,
                    eof: false,
                },
            };
        }
        step
    }
}

pub struct Source {
    pub entity: Rc<Entity>,
    clock: Clock,
    config: SourceConfig,
    signals: LinkSignals,
    reset: Reset,
    pause: Pause,
    core: RefCell<SourceCore>,
    pending: RefCell<VecDeque<Frame>>,
    frames_sent: Cell<usize>,
}

impl Source {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        signals: &LinkSignals,
        reset: &Reset,
        config: SourceConfig,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        signals.claim_source_side(&entity)?;
        let pause = Pause::new(&entity, &signals.valid);
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            config,
            signals: signals.clone(),
            reset: reset.clone(),
            pause,
            core: RefCell::new(SourceCore::default()),
            pending: RefCell::new(VecDeque::new()),
            frames_sent: Cell::new(0),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Queue a frame for transmission.
    pub fn enqueue(&self, frame: impl Into<Frame>) -> Result<(), LinkError> {
        let frame = frame.into();
        if frame.is_empty() {
            return Err(LinkError::InvalidFrame(format!(
                "{} can't send an empty frame",
                self.entity
            )));
        }
        trace!(self.entity ; "Queued frame {frame}");
        self.pending.borrow_mut().push_back(frame);
        Ok(())
    }

    /// Number of frames waiting to start.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// True when nothing is pending and no frame is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.is_empty() && !self.core.borrow().in_flight()
    }

    /// Withhold `valid` from the next edge while `paused`. A paused source
    /// holds its current byte and does not start a new frame.
    pub fn set_pause(&self, paused: bool) {
        self.pause.set(paused);
    }

    #[must_use]
    pub fn pause(&self) -> &Pause {
        &self.pause
    }

    /// Number of frames whose last byte has been accepted.
    #[must_use]
    pub fn frames_sent(&self) -> usize {
        self.frames_sent.get()
    }

    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn edge(&self) {
        let inputs = SourceInputs {
            reset: self.reset.is_asserted(),
            valid: self.signals.valid.value(),
            ready: self.signals.ready.value(),
            pause: self.pause.is_paused(),
        };
        let mut core = self.core.borrow_mut();
        let step = core.step(&self.config, inputs, &mut self.pending.borrow_mut());

        if step.finished {
            self.frames_sent.set(self.frames_sent.get() + 1);
        }
        if let (true, Some(frame)) = (step.started, core.frame()) {
            debug!(self.entity ; "Sending frame {frame}");
        }
        self.signals.drive_beat(step.outputs.beat);
        self.pause.drive(step.outputs.valid);
    }
}

#[async_trait(?Send)]
impl Runnable for Source {
    async fn run(&self) -> SimResult {
        loop {
            self.clock.wait_ticks(1).await;
            self.edge();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(valid: bool, ready: bool) -> SourceInputs {
        SourceInputs {
            reset: false,
            valid,
            ready,
            pause: false,
        }
    }

    /// Run the core with an always-ready sink and collect the beats sent.
    fn drain(
        config: &SourceConfig,
        pending: &mut VecDeque<Frame>,
        edges: usize,
    ) -> Vec<Option<Beat>> {
        let mut core = SourceCore::default();
        let mut driven = SourceOutputs::default();
        let mut seen = Vec::new();
        for _ in 0..edges {
            seen.push(driven.valid.then_some(driven.beat));
            driven = core.step(config, sampled(driven.valid, true), pending).outputs;
        }
        seen
    }

    #[test]
    fn first_byte_on_the_edge_after_start() {
        let mut pending = VecDeque::from([Frame::from(&[1, 2, 3])]);
        let mut core = SourceCore::default();

        let step = core.step(&SourceConfig::default(), sampled(false, false), &mut pending);
        assert!(step.started);
        assert_eq!(core.frame(), Some(&Frame::from(&[1, 2, 3])));
        assert!(step.outputs.valid);
        assert_eq!(
            step.outputs.beat,
            Beat {
                data: 1,
                sof: true,
                eof: false
            }
        );
        assert!(pending.is_empty());
        assert!(core.in_flight());
    }

    #[test]
    fn holds_byte_until_ready() {
        let mut pending = VecDeque::from([Frame::from(&[7, 8])]);
        let mut core = SourceCore::default();
        let config = SourceConfig::default();

        core.step(&config, sampled(false, false), &mut pending);
        for _ in 0..3 {
            let step = core.step(&config, sampled(true, false), &mut pending);
            assert_eq!(step.outputs.beat.data, 7);
            assert!(step.outputs.beat.sof);
        }
        let step = core.step(&config, sampled(true, true), &mut pending);
        assert_eq!(
            step.outputs.beat,
            Beat {
                data: 8,
                sof: false,
                eof: true
            }
        );
        let step = core.step(&config, sampled(true, true), &mut pending);
        assert!(step.finished);
        assert!(!step.outputs.valid);
        assert!(!core.in_flight());
    }

    #[test]
    fn zero_gap_between_frames() {
        let mut pending = VecDeque::from([Frame::from(&[1, 2]), Frame::from(&[3])]);
        let seen = drain(&SourceConfig::default(), &mut pending, 5);
        let data: Vec<Option<u8>> = seen.iter().map(|b| b.map(|b| b.data)).collect();
        assert_eq!(data, [None, Some(1), Some(2), Some(3), None]);
        assert!(seen[3].is_some_and(|b| b.sof && b.eof));
    }

    #[test]
    fn gap_without_zero_gap() {
        let mut pending = VecDeque::from([Frame::from(&[1, 2]), Frame::from(&[3])]);
        let config = SourceConfig { zero_gap: false };
        let seen = drain(&config, &mut pending, 6);
        let data: Vec<Option<u8>> = seen.iter().map(|b| b.map(|b| b.data)).collect();
        assert_eq!(data, [None, Some(1), Some(2), None, Some(3), None]);
    }

    #[test]
    fn pause_blocks_start_and_holds_beat() {
        let mut pending = VecDeque::from([Frame::from(&[5, 6])]);
        let mut core = SourceCore::default();
        let config = SourceConfig::default();
        let paused = |valid| SourceInputs {
            reset: false,
            valid,
            ready: true,
            pause: true,
        };

        let step = core.step(&config, paused(false), &mut pending);
        assert!(!step.started);
        assert!(!step.outputs.valid);
        assert_eq!(pending.len(), 1);

        let step = core.step(&config, sampled(false, true), &mut pending);
        assert!(step.started);
        assert_eq!(step.outputs.beat.data, 5);

        // The first byte transfers on the edge the pause is seen.
        let step = core.step(&config, paused(true), &mut pending);
        assert_eq!(step.outputs.beat.data, 6);

        // With valid masked on the bus the second byte is held.
        for _ in 0..3 {
            let step = core.step(&config, paused(false), &mut pending);
            assert!(step.outputs.valid);
            assert_eq!(step.outputs.beat.data, 6);
            assert!(core.in_flight());
        }
        let step = core.step(&config, sampled(true, true), &mut pending);
        assert!(step.finished);
        assert!(!step.outputs.valid);
    }

    #[test]
    fn reset_keeps_pending_frames() {
        let mut pending = VecDeque::from([Frame::from(&[1, 2, 3]), Frame::from(&[4])]);
        let mut core = SourceCore::default();
        let config = SourceConfig::default();

        core.step(&config, sampled(false, true), &mut pending);
        let reset = SourceInputs {
            reset: true,
            valid: true,
            ready: true,
            pause: false,
        };
        let step = core.step(&config, reset, &mut pending);
        assert!(!step.outputs.valid);
        assert!(!core.in_flight());
        assert_eq!(pending.len(), 1);
    }
}
