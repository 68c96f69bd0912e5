// Copyright (c) 2017-2020 Fabian Schuiki

//! Re-exports of commonly used IR items.

pub use crate::ir::{
    Block, BlockCall, Function, FunctionBuilder, Inst, InstData, InstFlags, Module, Opcode, Value,
    ValueData,
};
