// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use async_trait::async_trait;

use crate::types::SimResult;

/// Commits a value staged during the current tick.
pub trait Resolve {
    fn resolve(&self);
}

/// A component registered with the [`Engine`](crate::engine::Engine),
/// started in the background when the simulation runs.
#[async_trait(?Send)]
pub trait Runnable {
    async fn run(&self) -> SimResult {
        Ok(())
    }
}
