// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! Pre-wired links and stimulus shared by the tests, benchmarks and demos.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strobe_engine::clock::Clock;
use strobe_engine::engine::Engine;
use strobe_engine::types::SimError;
use strobe_track::entity::Entity;

use crate::frame::Frame;
use crate::monitor::LinkMonitor;
use crate::reset::Reset;
use crate::signals::LinkSignals;
use crate::sink::Sink;
use crate::skid_buffer::SkidBuffer;
use crate::source::{Source, SourceConfig};

/// The link clock. At 125MHz one tick is 8ns.
pub const LINK_CLOCK_MHZ: f64 = 125.0;

/// A 31 byte frame: a fixed header followed by a counting payload.
#[must_use]
pub fn reference_frame() -> Frame {
    let mut bytes = vec![
        0xda, 0xd1, 0xd2, 0xd3, 0xd4, 0xd5, 0x5a, 0x51, 0x52, 0x53, 0x54, 0x55, 0x80, 0x00,
    ];
    bytes.extend(0x00..=0x10);
    Frame::new(bytes)
}

/// Reproducible random frames with lengths in `min_len..=max_len`.
#[must_use]
pub fn random_frames(seed: u64, count: usize, min_len: usize, max_len: usize) -> Vec<Frame> {
    let mut rng = StdRng::seed_from_u64(seed);
    let min_len = min_len.max(1);
    let max_len = max_len.max(min_len);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(min_len..=max_len);
            Frame::new((0..len).map(|_| rng.r#gen::<u8>()).collect())
        })
        .collect()
}

/// A source and sink sharing a reset, either wired back to back or through a
/// [`SkidBuffer`].
pub struct LinkBench {
    pub entity: Rc<Entity>,
    pub clock: Clock,
    pub reset: Reset,
    pub source: Rc<Source>,
    pub sink: Rc<Sink>,

    /// Watches the link the sink is connected to.
    pub monitor: Rc<LinkMonitor>,

    /// The link driven by the source.
    pub tx: LinkSignals,

    /// The link sampled by the sink.
    pub rx: LinkSignals,

    pub skid_buffer: Option<Rc<SkidBuffer>>,
}

impl LinkBench {
    /// The source drives the sink directly.
    pub fn direct(engine: &mut Engine, config: SourceConfig) -> Result<Self, SimError> {
        Self::build(engine, config, false)
    }

    /// The source drives the sink through a [`SkidBuffer`].
    pub fn with_skid_buffer(engine: &mut Engine, config: SourceConfig) -> Result<Self, SimError> {
        Self::build(engine, config, true)
    }

    fn build(engine: &mut Engine, config: SourceConfig, skid: bool) -> Result<Self, SimError> {
        let clock = engine.clock_mhz(LINK_CLOCK_MHZ)?;
        let entity = Rc::new(Entity::new(engine.top(), "bench"));
        let reset = Reset::new(&entity, "reset", &clock);

        let tx = LinkSignals::new(&entity, "tx", &clock);
        let (rx, skid_buffer) = if skid {
            let rx = LinkSignals::new(&entity, "rx", &clock);
            let skid_buffer =
                SkidBuffer::new_and_register(engine, &clock, &entity, "skid", &tx, &rx, &reset)?;
            (rx, Some(skid_buffer))
        } else {
            (tx.clone(), None)
        };

        let source =
            Source::new_and_register(engine, &clock, &entity, "source", &tx, &reset, config)?;
        let sink = Sink::new_and_register(engine, &clock, &entity, "sink", &rx, &reset)?;
        let monitor =
            LinkMonitor::new_and_register(engine, &clock, &entity, "monitor", &rx, &reset);

        Ok(Self {
            entity,
            clock,
            reset,
            source,
            sink,
            monitor,
            tx,
            rx,
            skid_buffer,
        })
    }

    /// Edges between the source presenting a byte and the sink seeing it.
    #[must_use]
    pub fn latency(&self) -> u64 {
        u64::from(self.skid_buffer.is_some())
    }
}
