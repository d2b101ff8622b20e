// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crate::traits::Runnable;

/// A component as held by the [`Engine`](crate::engine::Engine).
pub type Component = Rc<dyn Runnable + 'static>;

#[macro_export]
/// `Err(SimError(msg.to_string()))`
macro_rules! sim_error {
    ($msg:expr) => {
        Err($crate::types::SimError($msg.to_string()))
    };
}

/// An error that stops the simulation.
#[derive(Debug, PartialEq)]
pub struct SimError(pub String);

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

impl Error for SimError {}

pub type SimResult = Result<(), SimError>;
