// Copyright (c) 2017-2021 Fabian Schuiki

//! Temporary representation of assembly after parsing.
//!
//! The grammar produces functions, blocks, and instructions that still refer
//! to values and blocks by name. These are built into IR once all block names
//! of a function are known. Values may be referenced before they are defined;
//! references to names which are never defined become undefined values.

use crate::{
    assembly::grammar,
    ir::{self, BlockCall, FunctionBuilder, InstData, InstFlags, Opcode},
};
use std::collections::HashMap;

/// An error encountered while parsing assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The line on which the error occurred, starting at 1.
    pub line: usize,
    /// A description of the error.
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse a module from assembly.
pub fn parse_module(input: &str) -> Result<ir::Module, ParseError> {
    let funcs = grammar::ModuleParser::new()
        .parse(input)
        .map_err(|e| syntax_error(input, e))?;
    let mut module = ir::Module::new();
    let mut names = HashMap::new();
    for func in funcs {
        let line = line_at(input, func.loc);
        let func = func.build(input)?;
        if let Some(prev) = names.insert(func.name().to_owned(), line) {
            return Err(ParseError::new(
                line,
                format!("function @{} already defined on line {}", func.name(), prev),
            ));
        }
        module.add_function(func);
    }
    Ok(module)
}

/// Parse a single function from assembly.
pub fn parse_function(input: &str) -> Result<ir::Function, ParseError> {
    grammar::FunctionParser::new()
        .parse(input)
        .map_err(|e| syntax_error(input, e))?
        .build(input)
}

/// Compute the line of a byte offset into the input, starting at 1.
fn line_at(input: &str, offset: usize) -> usize {
    input[..offset.min(input.len())].matches('\n').count() + 1
}

fn syntax_error<T>(
    input: &str,
    error: lalrpop_util::ParseError<usize, T, &'static str>,
) -> ParseError {
    use lalrpop_util::ParseError::*;
    match error {
        InvalidToken { location } => {
            let rest = &input[location..];
            let end = rest
                .char_indices()
                .skip(1)
                .find(|&(_, c)| c.is_whitespace() || ",(){}:".contains(c))
                .map(|(i, _)| i)
                .unwrap_or_else(|| rest.len());
            ParseError::new(
                line_at(input, location),
                format!("invalid token `{}`", &rest[..end]),
            )
        }
        UnrecognizedEOF { location, expected } => ParseError::new(
            line_at(input, location),
            format!("unexpected end of input{}", expected_list(&expected)),
        ),
        UnrecognizedToken {
            token: (lo, _, hi),
            expected,
        } => ParseError::new(
            line_at(input, lo),
            format!("unexpected `{}`{}", &input[lo..hi], expected_list(&expected)),
        ),
        ExtraToken { token: (lo, _, hi) } => ParseError::new(
            line_at(input, lo),
            format!("unexpected `{}` after function", &input[lo..hi]),
        ),
        User { error } => ParseError::new(1, error),
    }
}

/// Describe a short list of expected terminals. Long lists are omitted.
fn expected_list(expected: &[String]) -> String {
    if expected.is_empty() || expected.len() > 4 {
        return String::new();
    }
    let names: Vec<_> = expected
        .iter()
        .map(|e| format!("`{}`", e.trim_matches('"')))
        .collect();
    format!(", expected {}", names.join(" or "))
}

/// A function as it appears in the assembly.
pub struct Function<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
    pub blocks: Vec<Block<'a>>,
    pub loc: usize,
}

/// A basic block as it appears in the assembly.
pub struct Block<'a> {
    pub name: &'a str,
    pub params: Vec<&'a str>,
    pub insts: Vec<Inst<'a>>,
    pub loc: usize,
}

/// An instruction as it appears in the assembly.
pub struct Inst<'a> {
    pub opcode: Opcode,
    pub name: Option<&'a str>,
    pub flags: InstFlags,
    pub args: Vec<&'a str>,
    pub targets: Vec<(&'a str, Vec<&'a str>)>,
    pub imm: Option<&'a str>,
    pub callee: Option<&'a str>,
    pub loc: usize,
}

impl<'a> Inst<'a> {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            name: None,
            flags: InstFlags::empty(),
            args: vec![],
            targets: vec![],
            imm: None,
            callee: None,
            loc: 0,
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn location(mut self, loc: usize) -> Self {
        self.loc = loc;
        self
    }

    pub fn flags(mut self, flags: InstFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn args(mut self, args: Vec<&'a str>) -> Self {
        self.args = args;
        self
    }

    pub fn targets(mut self, targets: Vec<(&'a str, Vec<&'a str>)>) -> Self {
        self.targets = targets;
        self
    }

    pub fn imm(mut self, imm: &'a str) -> Self {
        self.imm = Some(imm);
        self
    }

    pub fn callee(mut self, callee: &'a str) -> Self {
        self.callee = Some(callee);
        self
    }

    fn build(
        self,
        builder: &mut FunctionBuilder,
        context: &mut Context<'a>,
    ) -> Result<(), ParseError> {
        let line = context.line(self.loc);
        let args = self
            .args
            .iter()
            .map(|&name| context.use_value(builder, name))
            .collect();
        let mut targets = vec![];
        for (name, args) in self.targets {
            let bb = context.block(name, line)?;
            let args = args
                .into_iter()
                .map(|name| context.use_value(builder, name))
                .collect();
            targets.push(BlockCall::new(bb, args));
        }
        let mut data = InstData::new(self.opcode)
            .with_flags(self.flags)
            .with_args(args)
            .with_targets(targets);
        if let Some(imm) = self.imm {
            let imm = imm
                .parse()
                .map_err(|_| ParseError::new(line, format!("integer `{}` out of range", imm)))?;
            data = data.with_imm(imm);
        }
        if let Some(callee) = self.callee {
            data = data.with_callee(callee);
        }
        let inst = builder.build_inst(data, self.name.is_some());
        if let Some(name) = self.name {
            let value = builder.inst_result(inst);
            context.define_value(builder, name, value, line)?;
        }
        Ok(())
    }
}

impl<'a> Block<'a> {
    fn build(
        self,
        builder: &mut FunctionBuilder,
        context: &mut Context<'a>,
    ) -> Result<(), ParseError> {
        builder.append_to(context.blocks[self.name]);
        for inst in self.insts {
            inst.build(builder, context)?;
        }
        Ok(())
    }
}

impl<'a> Function<'a> {
    /// Build the IR for this function.
    pub fn build(self, input: &'a str) -> Result<ir::Function, ParseError> {
        let mut func = ir::Function::new(self.name);
        let mut builder = FunctionBuilder::new(&mut func);
        let mut context = Context::new(input);
        let line = context.line(self.loc);

        for &name in &self.args {
            let value = builder.add_arg();
            context.define_value(&mut builder, name, value, line)?;
        }

        // Create all blocks up front such that branches may refer to blocks
        // further down.
        for block in &self.blocks {
            let bb = builder.named_block(block.name);
            if context.blocks.insert(block.name, bb).is_some() {
                return Err(ParseError::new(
                    context.line(block.loc),
                    format!("block %{} defined more than once", block.name),
                ));
            }
        }
        for block in &self.blocks {
            let bb = context.blocks[block.name];
            let line = context.line(block.loc);
            for &name in &block.params {
                let value = builder.add_block_param(bb);
                context.define_value(&mut builder, name, value, line)?;
            }
        }

        for block in self.blocks {
            block.build(&mut builder, &mut context)?;
        }

        // Resolve forward references to values defined later on.
        for (name, placeholder) in context.forward {
            if let Some(&value) = context.values.get(name) {
                builder.dfg.replace_use(placeholder, value);
                builder.dfg.remove_value(placeholder);
            } else {
                debug!("Value %{} in @{} is never defined", name, self.name);
            }
        }

        Ok(func)
    }
}

/// The names visible while building a function.
struct Context<'a> {
    input: &'a str,
    values: HashMap<&'a str, ir::Value>,
    forward: HashMap<&'a str, ir::Value>,
    blocks: HashMap<&'a str, ir::Block>,
}

impl<'a> Context<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            values: Default::default(),
            forward: Default::default(),
            blocks: Default::default(),
        }
    }

    fn line(&self, loc: usize) -> usize {
        line_at(self.input, loc)
    }

    /// Look up a value, creating a placeholder if it is not yet defined.
    fn use_value(&mut self, builder: &mut FunctionBuilder, name: &'a str) -> ir::Value {
        if let Some(&value) = self.values.get(name) {
            return value;
        }
        *self.forward.entry(name).or_insert_with(|| {
            let value = builder.undef();
            builder.set_name(value, name.to_owned());
            value
        })
    }

    /// Bind a name to a newly defined value.
    fn define_value(
        &mut self,
        builder: &mut FunctionBuilder,
        name: &'a str,
        value: ir::Value,
        line: usize,
    ) -> Result<(), ParseError> {
        if self.values.insert(name, value).is_some() {
            return Err(ParseError::new(
                line,
                format!("value %{} defined more than once", name),
            ));
        }
        builder.set_name(value, name.to_owned());
        Ok(())
    }

    fn block(&self, name: &str, line: usize) -> Result<ir::Block, ParseError> {
        self.blocks
            .get(name)
            .cloned()
            .ok_or_else(|| ParseError::new(line, format!("unknown block %{}", name)))
    }
}

pub use super::grammar::{FunctionParser, ModuleParser};
