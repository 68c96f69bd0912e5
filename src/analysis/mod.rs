// Copyright (c) 2017-2020 Fabian Schuiki

//! Analysis passes on the IR
//!
//! This module implements various analysis passes on the IR.

mod liveness;
mod preds;

pub use self::liveness::*;
pub use self::preds::*;
