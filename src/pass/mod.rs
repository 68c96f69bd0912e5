// Copyright (c) 2017-2021 Fabian Schuiki

//! Optimization and analysis passes on the IR.
//!
//! This module implements the infrastructure to run passes over a `Module`,
//! the registry through which passes are found by name or inserted into the
//! default pipeline, and the passes themselves.

use crate::ir::prelude::*;
use rayon::prelude::*;
use std::sync::Mutex;

pub mod dce;
mod registry;

pub use self::dce::DeadCodeElim;
pub use self::registry::*;

/// An optimization pass.
///
/// The optimization infrastructure will always call `run_on_module()`. However,
/// implementors of the trait only need to provide `run_on_function()`; the
/// module-level default distributes the functions across worker threads.
pub trait Pass {
    /// Run this pass on an entire module.
    ///
    /// Functions are processed in parallel. Returns whether any function was
    /// modified.
    fn run_on_module(ctx: &PassContext, module: &mut Module) -> bool {
        module
            .par_functions_mut()
            .map(|func| Self::run_on_function(ctx, func))
            .reduce(|| false, |a, b| a || b)
    }

    /// Run this pass on a single function.
    ///
    /// Returns whether the function was modified.
    fn run_on_function(ctx: &PassContext, func: &mut Function) -> bool;
}

/// Additional context and configuration for optimizations.
#[derive(Debug, Default)]
pub struct PassContext {
    diagnostics: Diagnostics,
}

impl PassContext {
    /// Create a context that prints diagnostics to stderr.
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a context that records diagnostics instead of printing them.
    pub fn capturing() -> Self {
        Self {
            diagnostics: Diagnostics::Capture(Mutex::new(vec![])),
        }
    }

    /// Create a context that discards diagnostics.
    pub fn silent() -> Self {
        Self {
            diagnostics: Diagnostics::Silent,
        }
    }

    /// Emit a diagnostic line.
    pub fn emit(&self, line: impl Into<String>) {
        let line = line.into();
        match &self.diagnostics {
            Diagnostics::Stderr => eprintln!("{}", line),
            Diagnostics::Capture(lines) => match lines.lock() {
                Ok(mut lines) => lines.push(line),
                Err(poisoned) => poisoned.into_inner().push(line),
            },
            Diagnostics::Silent => (),
        }
    }

    /// Return the diagnostic lines recorded so far.
    ///
    /// Empty unless the context was created with `capturing()`.
    pub fn captured(&self) -> Vec<String> {
        match &self.diagnostics {
            Diagnostics::Capture(lines) => match lines.lock() {
                Ok(lines) => lines.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            },
            _ => vec![],
        }
    }
}

/// Where passes report their diagnostic lines.
#[derive(Debug)]
pub enum Diagnostics {
    /// Print each line to stderr.
    Stderr,
    /// Record the lines in memory.
    Capture(Mutex<Vec<String>>),
    /// Discard the lines.
    Silent,
}

impl Default for Diagnostics {
    fn default() -> Diagnostics {
        Diagnostics::Stderr
    }
}
