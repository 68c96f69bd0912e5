// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of instructions.
//!
//! This module implements the various instructions of the intermediate
//! representation, together with the `InstBuilder` used to construct them.

use crate::ir::{Block, Function, FunctionBuilder, Inst, Value};
use bitflags::bitflags;
use itertools::Itertools;

/// A temporary object used to construct a single instruction.
pub struct InstBuilder<'a, 'b> {
    builder: &'b mut FunctionBuilder<'a>,
    name: Option<String>,
}

impl<'a, 'b> InstBuilder<'a, 'b> {
    /// Create a new instruction builder that inserts into `builder`.
    pub fn new(builder: &'b mut FunctionBuilder<'a>) -> Self {
        Self {
            builder,
            name: None,
        }
    }

    /// Assign a name to the instruction being built.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

macro_rules! binary_builders {
    ($($(#[$m:meta])* fn $name:ident => $opcode:ident;)*) => {
        $(
            $(#[$m])*
            pub fn $name(&mut self, x: Value, y: Value) -> Value {
                self.build_value(InstData::new(Opcode::$opcode).with_args(vec![x, y]))
            }
        )*
    };
}

impl<'a, 'b> InstBuilder<'a, 'b> {
    /// Construct an integer constant.
    pub fn const_int(&mut self, imm: i64) -> Value {
        self.build_value(InstData::new(Opcode::Const).with_imm(imm))
    }

    /// Bitwise complement of a value.
    pub fn not(&mut self, x: Value) -> Value {
        self.build_value(InstData::new(Opcode::Not).with_args(vec![x]))
    }

    /// Arithmetic negation of a value.
    pub fn neg(&mut self, x: Value) -> Value {
        self.build_value(InstData::new(Opcode::Neg).with_args(vec![x]))
    }

    binary_builders! {
        /// Addition.
        fn add => Add;
        /// Subtraction.
        fn sub => Sub;
        /// Multiplication.
        fn mul => Mul;
        /// Division.
        fn div => Div;
        /// Remainder.
        fn rem => Rem;
        /// Bitwise and.
        fn and => And;
        /// Bitwise or.
        fn or => Or;
        /// Bitwise exclusive or.
        fn xor => Xor;
        /// Shift left.
        fn shl => Shl;
        /// Shift right.
        fn shr => Shr;
        /// Equality comparison.
        fn eq => Eq;
        /// Inequality comparison.
        fn neq => Neq;
        /// Less-than comparison.
        fn lt => Lt;
        /// Less-than-or-equal comparison.
        fn le => Le;
        /// Greater-than comparison.
        fn gt => Gt;
        /// Greater-than-or-equal comparison.
        fn ge => Ge;
    }

    /// Allocate a stack slot and return a pointer to it.
    pub fn alloca(&mut self) -> Value {
        self.build_value(InstData::new(Opcode::Alloca))
    }

    /// Load a value from memory.
    pub fn load(&mut self, ptr: Value) -> Value {
        self.build_value(InstData::new(Opcode::Load).with_args(vec![ptr]))
    }

    /// Load a value from memory. The access itself is observable.
    pub fn load_volatile(&mut self, ptr: Value) -> Value {
        self.build_value(
            InstData::new(Opcode::Load)
                .with_args(vec![ptr])
                .with_flags(InstFlags::VOLATILE),
        )
    }

    /// Store a value to memory.
    pub fn store(&mut self, ptr: Value, value: Value) -> Inst {
        self.build(InstData::new(Opcode::Store).with_args(vec![ptr, value]), false)
    }

    /// Call a function and use its return value.
    pub fn call(&mut self, callee: impl Into<String>, args: Vec<Value>) -> Value {
        self.build_value(InstData::new(Opcode::Call).with_callee(callee).with_args(args))
    }

    /// Call a function without a return value.
    pub fn call_void(&mut self, callee: impl Into<String>, args: Vec<Value>) -> Inst {
        self.build(
            InstData::new(Opcode::Call).with_callee(callee).with_args(args),
            false,
        )
    }

    /// Call a function known to have no observable effects.
    pub fn call_pure(&mut self, callee: impl Into<String>, args: Vec<Value>) -> Value {
        self.build_value(
            InstData::new(Opcode::Call)
                .with_callee(callee)
                .with_args(args)
                .with_flags(InstFlags::PURE),
        )
    }

    /// Unconditionally branch to a block.
    pub fn br(&mut self, target: impl Into<BlockCall>) -> Inst {
        self.build(InstData::new(Opcode::Br).with_targets(vec![target.into()]), false)
    }

    /// Branch to `if_true` if `cond` is non-zero, or to `if_false` otherwise.
    pub fn br_cond(
        &mut self,
        cond: Value,
        if_true: impl Into<BlockCall>,
        if_false: impl Into<BlockCall>,
    ) -> Inst {
        self.build(
            InstData::new(Opcode::BrCond)
                .with_args(vec![cond])
                .with_targets(vec![if_true.into(), if_false.into()]),
            false,
        )
    }

    /// Return from the function.
    pub fn ret(&mut self) -> Inst {
        self.build(InstData::new(Opcode::Ret), false)
    }

    /// Return a value from the function.
    pub fn ret_value(&mut self, value: Value) -> Inst {
        self.build(InstData::new(Opcode::RetValue).with_args(vec![value]), false)
    }

    /// Mark the end of a block that cannot be reached.
    pub fn unreachable(&mut self) -> Inst {
        self.build(InstData::new(Opcode::Unreachable), false)
    }

    fn build_value(&mut self, data: InstData) -> Value {
        let inst = self.build(data, true);
        self.builder.inst_result(inst)
    }

    fn build(&mut self, data: InstData, has_result: bool) -> Inst {
        let inst = self.builder.build_inst(data, has_result);
        if let Some(name) = self.name.take() {
            if let Some(value) = self.builder.get_inst_result(inst) {
                self.builder.set_name(value, name);
            }
        }
        inst
    }
}

/// A branch target, together with the arguments bound to the target's block
/// parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockCall {
    /// The target block.
    pub block: Block,
    /// The arguments passed to the block's parameters.
    pub args: Vec<Value>,
}

impl BlockCall {
    /// Create a new branch target.
    pub fn new(block: Block, args: Vec<Value>) -> Self {
        Self { block, args }
    }
}

impl From<Block> for BlockCall {
    fn from(block: Block) -> BlockCall {
        BlockCall::new(block, vec![])
    }
}

impl From<(Block, Vec<Value>)> for BlockCall {
    fn from((block, args): (Block, Vec<Value>)) -> BlockCall {
        BlockCall::new(block, args)
    }
}

bitflags! {
    /// Modifiers attached to an instruction.
    #[derive(Default)]
    pub struct InstFlags: u8 {
        /// The instruction accesses memory in an observable way.
        const VOLATILE = 0b01;
        /// The called function has no observable effects.
        const PURE = 0b10;
    }
}

/// Internal table storage for instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstData {
    opcode: Opcode,
    args: Vec<Value>,
    targets: Vec<BlockCall>,
    imm: Option<i64>,
    callee: Option<String>,
    flags: InstFlags,
}

impl InstData {
    /// Create a new instruction without operands.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: vec![],
            targets: vec![],
            imm: None,
            callee: None,
            flags: InstFlags::empty(),
        }
    }

    /// Set the value operands.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Set the branch targets.
    pub fn with_targets(mut self, targets: Vec<BlockCall>) -> Self {
        self.targets = targets;
        self
    }

    /// Set the immediate.
    pub fn with_imm(mut self, imm: i64) -> Self {
        self.imm = Some(imm);
        self
    }

    /// Set the called function.
    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = Some(callee.into());
        self
    }

    /// Set the instruction flags.
    pub fn with_flags(mut self, flags: InstFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Get the opcode of the instruction.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Get the value operands of the instruction.
    ///
    /// Arguments passed to branch targets are not included; see `uses()`.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Get the branch targets of the instruction.
    pub fn targets(&self) -> &[BlockCall] {
        &self.targets
    }

    /// Return an iterator over the blocks this instruction may transfer
    /// control to.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        self.targets.iter().map(|t| t.block)
    }

    /// Return an iterator over every value the instruction reads.
    pub fn uses<'a>(&'a self) -> impl Iterator<Item = Value> + 'a {
        self.args
            .iter()
            .chain(self.targets.iter().flat_map(|t| t.args.iter()))
            .cloned()
    }

    /// Replace all uses of a value with another.
    pub(crate) fn replace_use(&mut self, from: Value, to: Value) -> usize {
        let mut count = 0;
        let targets = self.targets.iter_mut().flat_map(|t| t.args.iter_mut());
        for arg in self.args.iter_mut().chain(targets) {
            if *arg == from {
                *arg = to;
                count += 1;
            }
        }
        count
    }

    /// Get the immediate of a constant.
    pub fn imm(&self) -> Option<i64> {
        self.imm
    }

    /// Get the name of the called function.
    pub fn callee(&self) -> Option<&str> {
        self.callee.as_ref().map(AsRef::as_ref)
    }

    /// Get the instruction flags.
    pub fn flags(&self) -> InstFlags {
        self.flags
    }

    /// Check whether executing this instruction can be observed beyond its
    /// result value.
    ///
    /// Instructions with side effects are never removed by dead code
    /// elimination, regardless of whether their result is used.
    pub fn has_side_effects(&self) -> bool {
        if self.flags.contains(InstFlags::VOLATILE) {
            return true;
        }
        match self.opcode {
            Opcode::Call => !self.flags.contains(InstFlags::PURE),
            opcode => opcode.has_side_effects(),
        }
    }
}

/// An instruction opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    Const,
    Not,
    Neg,

    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,

    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    Alloca,
    Load,
    Store,
    Call,

    Br,
    BrCond,
    Ret,
    RetValue,
    Unreachable,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                Opcode::Const => "const",
                Opcode::Not => "not",
                Opcode::Neg => "neg",
                Opcode::Add => "add",
                Opcode::Sub => "sub",
                Opcode::Mul => "mul",
                Opcode::Div => "div",
                Opcode::Rem => "rem",
                Opcode::And => "and",
                Opcode::Or => "or",
                Opcode::Xor => "xor",
                Opcode::Shl => "shl",
                Opcode::Shr => "shr",
                Opcode::Eq => "eq",
                Opcode::Neq => "neq",
                Opcode::Lt => "lt",
                Opcode::Le => "le",
                Opcode::Gt => "gt",
                Opcode::Ge => "ge",
                Opcode::Alloca => "alloca",
                Opcode::Load => "load",
                Opcode::Store => "store",
                Opcode::Call => "call",
                Opcode::Br => "br",
                Opcode::BrCond => "br",
                Opcode::Ret => "ret",
                Opcode::RetValue => "ret",
                Opcode::Unreachable => "unreachable",
            }
        )
    }
}

impl Opcode {
    /// Check if this is a unary operation.
    pub fn is_unary(self) -> bool {
        match self {
            Opcode::Not | Opcode::Neg => true,
            _ => false,
        }
    }

    /// Check if this instruction is a terminator.
    pub fn is_terminator(self) -> bool {
        match self {
            Opcode::Br
            | Opcode::BrCond
            | Opcode::Ret
            | Opcode::RetValue
            | Opcode::Unreachable => true,
            _ => false,
        }
    }

    /// Check if instructions with this opcode have side effects.
    ///
    /// Calls are conservatively treated as having side effects; use
    /// `InstData::has_side_effects` to account for pure calls.
    pub fn has_side_effects(self) -> bool {
        match self {
            Opcode::Store | Opcode::Call => true,
            op => op.is_terminator(),
        }
    }
}

impl Inst {
    /// Dump the instruction in human readable form.
    pub fn dump(self, func: &Function) -> InstDumper {
        InstDumper(self, func)
    }
}

/// Temporary object to dump an `Inst` in human-readable form for debugging.
pub struct InstDumper<'a>(Inst, &'a Function);

impl std::fmt::Display for InstDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inst = self.0;
        let func = self.1;
        let data = &func[inst];
        if let Some(result) = func.get_inst_result(inst) {
            write!(f, "{} = ", result.dump(func))?;
        }
        write!(f, "{}", data.opcode())?;
        if data.flags().contains(InstFlags::VOLATILE) {
            write!(f, " volatile")?;
        }
        if data.flags().contains(InstFlags::PURE) {
            write!(f, " pure")?;
        }
        if let Some(imm) = data.imm() {
            write!(f, " {}", imm)?;
        }
        let args = data.args().iter().map(|arg| arg.dump(func)).format(", ");
        if let Some(callee) = data.callee() {
            return write!(f, " @{}({})", callee, args);
        }
        if !data.args().is_empty() {
            write!(f, " {}", args)?;
        }
        let mut sep = if data.args().is_empty() { " " } else { ", " };
        for target in data.targets() {
            write!(f, "{}{}", sep, target.block.dump(func))?;
            if !target.args.is_empty() {
                write!(
                    f,
                    "({})",
                    target.args.iter().map(|arg| arg.dump(func)).format(", ")
                )?;
            }
            sep = ", ";
        }
        Ok(())
    }
}
