// Copyright (c) 2017-2019 Fabian Schuiki

//! Collections of functions.
//!
//! This module implements the `Module`, a collection of `Function`s. A module
//! acts as the root node of an intermediate representation, and is the unit of
//! information ingested by the reader and emitted by the writer.

use crate::ir::Function;
use rayon::prelude::*;

/// A module.
///
/// This is the root node of an intermediate representation. Functions are
/// kept in the order in which they were added.
#[derive(Debug, Clone, Default)]
pub struct Module {
    functions: Vec<Function>,
}

impl Module {
    /// Create a new empty module.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a function to the module.
    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    /// Return an iterator over the functions in this module.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Return a parallel iterator over the functions in this module.
    ///
    /// Every function is handed out exactly once, so passes may run on
    /// different functions concurrently.
    pub fn par_functions_mut(&mut self) -> impl ParallelIterator<Item = &mut Function> {
        self.functions.par_iter_mut()
    }

    /// Find a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Count the instructions in all functions of the module.
    pub fn num_insts(&self) -> usize {
        self.functions.iter().map(Function::num_insts).sum()
    }
}
