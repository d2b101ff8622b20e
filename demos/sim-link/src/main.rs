// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Stream random frames over a link.
//!
//! See `lib.rs` for details.

use std::cell::Cell;
use std::rc::Rc;

use clap::Parser;
use sim_link::config::{Cli, Dut, SimConfig};
use strobe_engine::engine::Engine;
use strobe_engine::sim_error;
use strobe_engine::types::SimError;
use strobe_link::frame::Frame;
use strobe_link::pause::PauseSchedule;
use strobe_link::test_helpers::{LinkBench, random_frames};
use strobe_track::builder::setup_trackers;
use strobe_track::entity::Entity;
use strobe_track::{error, info};

/// Drive `schedule` onto a pause until all frames have been received.
fn spawn_pause(
    engine: &Engine,
    bench: &LinkBench,
    source_side: bool,
    schedule: PauseSchedule,
    frames: usize,
) {
    if schedule == PauseSchedule::Never {
        return;
    }
    let pause = if source_side {
        bench.source.pause().clone()
    } else {
        bench.sink.pause().clone()
    };
    let sink = bench.sink.clone();
    let clock = bench.clock.clone();
    engine.spawn(async move {
        pause
            .run_schedule(&clock, &schedule, || sink.frames_received() >= frames)
            .await
    });
}

/// Send all the frames and check each one as it arrives.
fn spawn_scoreboard(
    engine: &Engine,
    bench: &LinkBench,
    config: &SimConfig,
    frames: Vec<Frame>,
    matched: Rc<Cell<usize>>,
) {
    let entity = Rc::new(Entity::new(&bench.entity, "scoreboard"));
    let reset = bench.reset.clone();
    let source = bench.source.clone();
    let sink = bench.sink.clone();
    let reset_ticks = config.reset_ticks;
    let timeout_ticks = config.timeout_ticks;
    engine.spawn(async move {
        reset.pulse(reset_ticks).await;
        for frame in &frames {
            source.enqueue(frame.clone())?;
        }

        for (i, expected) in frames.iter().enumerate() {
            sink.wait(timeout_ticks).await?;
            let Some(received) = sink.recv() else {
                return sim_error!(format!("frame {i} missing"));
            };
            if received != *expected {
                error!(entity ; "Frame {i}: expected {expected}, got {received}");
                return sim_error!(format!("frame {i} mismatch"));
            }
            matched.set(matched.get() + 1);
        }
        Ok(())
    });
}

fn main() -> Result<(), SimError> {
    let cli = Cli::parse();
    let config = SimConfig::load(&cli)?;
    let tracker = setup_trackers(&config.trackers()).map_err(|e| SimError(e.to_string()))?;

    let mut engine = Engine::new(&tracker);
    let bench = match config.dut {
        Dut::Direct => LinkBench::direct(&mut engine, config.source_config())?,
        Dut::Skid => LinkBench::with_skid_buffer(&mut engine, config.source_config())?,
    };

    let top = engine.top().clone();
    info!(top ;
        "Sending {} frames of {}-{} bytes over {:?} link: zero gap={}, source pause={}, sink pause={}.",
        config.frames,
        config.min_len,
        config.max_len,
        config.dut,
        config.zero_gap,
        config.source_pause_probability,
        config.sink_pause_probability,
    );

    let frames = random_frames(config.seed, config.frames, config.min_len, config.max_len);
    let total_bytes: usize = frames.iter().map(|f| f.len()).sum();

    spawn_pause(&engine, &bench, true, config.source_pause(), frames.len());
    spawn_pause(&engine, &bench, false, config.sink_pause(), frames.len());

    let matched = Rc::new(Cell::new(0));
    spawn_scoreboard(&engine, &bench, &config, frames, matched.clone());

    if let Err(e) = engine.run() {
        error!(top ; "{}/{} frames matched at {:.2}ns", matched.get(), config.frames, bench.clock.time_now_ns());
        tracker.shutdown();
        return Err(e);
    }

    print_summary(&top, &bench, total_bytes);
    tracker.shutdown();
    Ok(())
}

fn print_summary(top: &Rc<Entity>, bench: &LinkBench, total_bytes: usize) {
    let monitor = &bench.monitor;
    let edges = monitor.transfers() + monitor.stall_ticks() + monitor.idle_ticks();
    let utilisation = if edges == 0 {
        0.0
    } else {
        monitor.transfers() as f64 * 100.0 / edges as f64
    };

    info!(top ; "Pass: received {} frames ({} bytes) in {:.2}ns.",
        bench.sink.frames_received(),
        total_bytes,
        bench.clock.time_now_ns());
    info!(top ; "Link: {} transfer, {} stall and {} idle edges ({utilisation:.1}% busy).",
        monitor.transfers(),
        monitor.stall_ticks(),
        monitor.idle_ticks());
    if bench.sink.protocol_violations() != 0 {
        error!(top ; "{} protocol violations", bench.sink.protocol_violations());
    }
}
