// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of functions, basic blocks, and instructions.
//!
//! This module implements the intermediate representation around which the rest
//! of the framework is built. A `Module` holds `Function`s; each function owns
//! its basic blocks, instructions, and values in tables indexed by opaque ids.
//! Blocks refer to each other only through these ids, so loops in the control
//! flow graph never turn into ownership cycles.

use crate::impl_table_key;

mod dfg;
mod function;
mod inst;
mod layout;
mod module;
pub mod prelude;

pub use self::dfg::*;
pub use self::function::*;
pub use self::inst::*;
pub use self::layout::*;
pub use self::module::*;

impl_table_key! {
    /// An instruction.
    struct Inst(u32) as "i";

    /// A value.
    struct Value(u32) as "v";

    /// A basic block.
    struct Block(u32) as "bb";
}

/// Internal table storage for values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueData {
    /// The value is the result of an instruction.
    Inst { inst: Inst },
    /// The value is the argument at position `index` of the function.
    Arg { index: usize },
    /// The value is the parameter at position `index` of a block.
    Param { block: Block, index: usize },
    /// The value is referenced but never defined.
    Undef,
}

impl ValueData {
    /// Check if this value has no definition.
    pub fn is_undef(&self) -> bool {
        match self {
            ValueData::Undef => true,
            _ => false,
        }
    }
}
