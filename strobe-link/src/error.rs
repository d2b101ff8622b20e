// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! Errors reported by the link agents.

use std::error::Error;
use std::fmt;

use strobe_engine::types::SimError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// A frame that can't be transmitted, such as an empty one.
    InvalidFrame(String),

    /// The handshake or framing markers seen by a sink were inconsistent.
    ProtocolViolation(String),

    /// No frame completed within the given number of clock ticks.
    Timeout { ticks: u64 },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::InvalidFrame(reason) => write!(f, "invalid frame: {reason}"),
            LinkError::ProtocolViolation(reason) => write!(f, "protocol violation: {reason}"),
            LinkError::Timeout { ticks } => write!(f, "timed out after {ticks} ticks"),
        }
    }
}

impl Error for LinkError {}

impl From<LinkError> for SimError {
    fn from(e: LinkError) -> Self {
        SimError(e.to_string())
    }
}
