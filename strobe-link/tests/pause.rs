// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

use std::cell::Cell;
use std::rc::Rc;

use strobe_engine::run_simulation;
use strobe_engine::test_helpers::start_test;
use strobe_link::pause::PauseSchedule;
use strobe_link::source::SourceConfig;
use strobe_link::test_helpers::{LinkBench, random_frames, reference_frame};

mod common;
use common::{FIRST_EDGE, RESET_TICKS, receive};

/// Ticks into the first frame before a pause is applied.
const PAUSE_AFTER: u64 = 8;

/// Four 8ns ticks.
const PAUSE_TICKS: u64 = 4;

#[test]
fn source_pause_delays_frame() {
    let mut engine = start_test(file!());
    let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
    let done_tick = Rc::new(Cell::new(0));
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        let done_tick = done_tick.clone();
        engine.spawn(async move {
            reset.pulse(RESET_TICKS).await;
            source.enqueue(reference_frame())?;

            clock.wait_ticks(PAUSE_AFTER).await;
            source.set_pause(true);
            clock.wait_ticks(PAUSE_TICKS).await;
            source.set_pause(false);

            sink.wait(100).await?;
            done_tick.set(clock.tick_now());
            assert_eq!(sink.recv(), Some(reference_frame()));
            Ok(())
        });
    }
    run_simulation!(engine);

    let len = reference_frame().len() as u64;
    assert_eq!(done_tick.get(), FIRST_EDGE + len + PAUSE_TICKS);
    assert_eq!(bench.monitor.stall_ticks(), 0);

    let spans = bench.monitor.frame_spans();
    assert_eq!(spans[0].edges(), len + PAUSE_TICKS);
}

#[test]
fn sink_pause_stalls_without_loss() {
    let mut engine = start_test(file!());
    let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
    let done_tick = Rc::new(Cell::new(0));
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        let done_tick = done_tick.clone();
        engine.spawn(async move {
            reset.pulse(RESET_TICKS).await;
            source.enqueue(reference_frame())?;

            clock.wait_ticks(PAUSE_AFTER).await;
            sink.set_pause(true);
            clock.wait_ticks(PAUSE_TICKS).await;
            // The byte on the bus when the pause was set is the last accepted
            assert_eq!(sink.partial_len(), (PAUSE_AFTER - 1) as usize);
            sink.set_pause(false);

            sink.wait(100).await?;
            done_tick.set(clock.tick_now());
            assert_eq!(sink.recv(), Some(reference_frame()));
            Ok(())
        });
    }
    run_simulation!(engine);

    let len = reference_frame().len() as u64;
    assert_eq!(done_tick.get(), FIRST_EDGE + len + PAUSE_TICKS);
    assert_eq!(bench.monitor.stall_ticks(), PAUSE_TICKS);
    assert_eq!(bench.monitor.transfers(), len);
    assert_eq!(bench.sink.bytes_received(), 31);
}

fn pause_seen_on_next_edge(source_side: bool) {
    let mut engine = start_test(file!());
    let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        let tx = bench.tx.clone();
        engine.spawn(async move {
            reset.pulse(RESET_TICKS).await;
            source.enqueue(reference_frame())?;
            let pause = if source_side {
                source.pause()
            } else {
                sink.pause()
            };

            clock.wait_ticks(PAUSE_AFTER).await;
            assert!(tx.is_transfer());
            pause.set(true);
            clock.wait_ticks(1).await;
            assert!(!tx.is_transfer());
            assert_eq!(tx.valid.value(), !source_side);
            assert_eq!(tx.ready.value(), source_side);

            clock.wait_ticks(1).await;
            assert!(!tx.is_transfer());
            assert_eq!(sink.partial_len(), (PAUSE_AFTER - 1) as usize);
            pause.set(false);
            clock.wait_ticks(1).await;
            assert!(tx.is_transfer());

            sink.wait(100).await?;
            assert_eq!(sink.recv(), Some(reference_frame()));
            Ok(())
        });
    }
    run_simulation!(engine);

    let len = reference_frame().len() as u64;
    assert_eq!(bench.monitor.transfers(), len);
    assert_eq!(bench.monitor.frame_spans()[0].edges(), len + 2);
}

#[test]
fn source_pause_drops_valid_on_next_edge() {
    pause_seen_on_next_edge(true);
}

#[test]
fn sink_pause_drops_ready_on_next_edge() {
    pause_seen_on_next_edge(false);
}

#[test]
fn source_pause_before_frame_delays_first_byte() {
    let mut engine = start_test(file!());
    let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        engine.spawn(async move {
            source.set_pause(true);
            reset.pulse(RESET_TICKS).await;
            source.enqueue(reference_frame())?;

            clock.wait_ticks(PAUSE_TICKS).await;
            assert_eq!(source.pending_count(), 1);
            assert_eq!(sink.partial_len(), 0);
            source.set_pause(false);

            sink.wait(100).await?;
            assert_eq!(sink.recv(), Some(reference_frame()));
            assert!(sink.is_empty());
            Ok(())
        });
    }
    run_simulation!(engine);

    let len = reference_frame().len();
    let spans = bench.monitor.frame_spans();
    assert_eq!(spans.len(), 1);
    assert!(spans[0].first_tick >= FIRST_EDGE + PAUSE_TICKS);
    assert_eq!(spans[0].len, len);
    assert_eq!(spans[0].edges(), len as u64);
    assert_eq!(bench.sink.bytes_received(), len);
}

#[test]
fn source_then_sink_pause_over_two_frames() {
    let mut engine = start_test(file!());
    let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
    let done_tick = Rc::new(Cell::new(0));
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        let done_tick = done_tick.clone();
        engine.spawn(async move {
            reset.pulse(RESET_TICKS).await;
            source.enqueue(reference_frame())?;
            source.enqueue(reference_frame())?;

            clock.wait_ticks(PAUSE_AFTER).await;
            source.set_pause(true);
            clock.wait_ticks(PAUSE_TICKS).await;
            source.set_pause(false);

            clock.wait_ticks(PAUSE_TICKS).await;
            sink.set_pause(true);
            clock.wait_ticks(PAUSE_TICKS).await;
            sink.set_pause(false);

            let frames = receive(&sink, 2, 200).await?;
            done_tick.set(clock.tick_now());
            assert_eq!(frames, vec![reference_frame(), reference_frame()]);
            Ok(())
        });
    }
    run_simulation!(engine);

    let len = reference_frame().len() as u64;
    assert_eq!(done_tick.get(), FIRST_EDGE + 2 * len + 2 * PAUSE_TICKS);
    assert_eq!(bench.monitor.gaps(), vec![0]);
    assert_eq!(bench.monitor.stall_ticks(), PAUSE_TICKS);
    assert_eq!(bench.sink.frames_received(), 2);
    assert_eq!(bench.sink.protocol_violations(), 0);
}

#[test]
fn alternating_source_pause() {
    let mut engine = start_test(file!());
    let bench = LinkBench::direct(&mut engine, SourceConfig::default()).unwrap();
    let frames = random_frames(3, 6, 1, 24);
    let count = frames.len();
    {
        let pause = bench.source.pause().clone();
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        let schedule = PauseSchedule::Alternate {
            paused_ticks: 1,
            running_ticks: 1,
        };
        engine.spawn(async move {
            pause
                .run_schedule(&clock, &schedule, || sink.frames_received() >= count)
                .await
        });
    }
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let frames = frames.clone();
        engine.spawn(async move {
            reset.pulse(RESET_TICKS).await;
            for frame in &frames {
                source.enqueue(frame.clone())?;
            }
            let received = receive(&sink, frames.len(), 1000).await?;
            assert_eq!(received, frames);
            Ok(())
        });
    }
    run_simulation!(engine);

    let total: u64 = frames.iter().map(|f| f.len() as u64).sum();
    assert_eq!(bench.monitor.transfers(), total);
    assert!(bench.monitor.idle_ticks() >= total - 1);
}

fn random_pauses(skid: bool, seed: u64) {
    let mut engine = start_test(file!());
    let bench = if skid {
        LinkBench::with_skid_buffer(&mut engine, SourceConfig::default()).unwrap()
    } else {
        LinkBench::direct(&mut engine, SourceConfig::default()).unwrap()
    };
    let frames = random_frames(seed, 20, 1, 64);
    let count = frames.len();

    let schedules = [
        (
            bench.source.pause().clone(),
            PauseSchedule::Random {
                probability: 0.3,
                seed: seed + 1,
            },
        ),
        (
            bench.sink.pause().clone(),
            PauseSchedule::Random {
                probability: 0.5,
                seed: seed + 2,
            },
        ),
    ];
    for (pause, schedule) in schedules {
        let sink = bench.sink.clone();
        let clock = bench.clock.clone();
        engine.spawn(async move {
            pause
                .run_schedule(&clock, &schedule, || sink.frames_received() >= count)
                .await
        });
    }
    {
        let reset = bench.reset.clone();
        let source = bench.source.clone();
        let sink = bench.sink.clone();
        let frames = frames.clone();
        engine.spawn(async move {
            reset.pulse(RESET_TICKS).await;
            for frame in &frames {
                source.enqueue(frame.clone())?;
            }
            let received = receive(&sink, frames.len(), 10_000).await?;
            assert_eq!(received, frames);
            Ok(())
        });
    }
    run_simulation!(engine);

    let total: usize = frames.iter().map(|f| f.len()).sum();
    assert_eq!(bench.sink.bytes_received(), total);
    assert_eq!(bench.sink.protocol_violations(), 0);
    assert!(bench.monitor.stall_ticks() > 0);
    for (span, frame) in bench.monitor.frame_spans().iter().zip(&frames) {
        assert_eq!(span.len, frame.len());
    }
}

#[test]
fn random_pauses_direct() {
    random_pauses(false, 100);
}

#[test]
fn random_pauses_through_skid_buffer() {
    random_pauses(true, 200);
}
