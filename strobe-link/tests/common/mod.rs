// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

#![allow(dead_code)]

use strobe_engine::types::SimError;
use strobe_link::frame::Frame;
use strobe_link::sink::Sink;

/// Edges reset is held for at the start of each test.
pub const RESET_TICKS: u64 = 2;

/// The first edge out of reset.
pub const FIRST_EDGE: u64 = RESET_TICKS + 1;

/// Wait for and take `count` frames from `sink`.
pub async fn receive(
    sink: &Sink,
    count: usize,
    timeout_ticks: u64,
) -> Result<Vec<Frame>, SimError> {
    let mut frames = Vec::with_capacity(count);
    while frames.len() < count {
        sink.wait(timeout_ticks).await?;
        while let Some(frame) = sink.recv() {
            frames.push(frame);
        }
    }
    Ok(frames)
}
