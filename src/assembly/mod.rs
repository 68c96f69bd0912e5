// Copyright (c) 2017-2021 Fabian Schuiki

//! Facilities to emit a module as human-readable assembly, or to parse such
//! assembly back into a module.
//!
//! A function is written as follows:
//!
//! ```text
//! func @max (%a, %b) {
//! %entry:
//!     %c = gt %a, %b
//!     br %c, %exit(%a), %exit(%b)
//! %exit(%r):
//!     ret %r
//! }
//! ```

use lalrpop_util::lalrpop_mod;

pub mod reader;
pub mod writer;

lalrpop_mod!(#[allow(clippy::all, unused_parens)] grammar, "/assembly/grammar.rs");

pub use self::reader::{parse_function, parse_module, ParseError};
pub use self::writer::{write_module, write_string, Writer};
