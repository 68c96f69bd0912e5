// Copyright (c) 2017-2021 Fabian Schuiki

//! Iterative liveness analysis and dead code elimination. This library provides
//! a small basic block IR, tools to read and write it as assembly, and a pass
//! that removes instructions whose results are never live.

#[macro_use]
extern crate log;

pub mod analysis;
pub mod assembly;
pub mod ir;
pub mod pass;
pub mod table;
pub mod verifier;
