// Copyright (c) 2017-2021 Fabian Schuiki

//! Functions and the builder used to construct them.

use crate::{
    impl_table_indexing,
    ir::{
        Block, BlockData, DataFlowGraph, FunctionLayout, Inst, InstBuilder, InstData, Value,
        ValueData,
    },
};
use std::ops::{Deref, DerefMut};

/// A function.
///
/// Owns its basic blocks, instructions, and values. The first block in layout
/// order is the entry block.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    args: Vec<Value>,
    pub(crate) dfg: DataFlowGraph,
    pub(crate) layout: FunctionLayout,
}

impl_table_indexing!(Function, dfg, Inst, InstData);
impl_table_indexing!(Function, dfg, Value, ValueData);

impl Function {
    /// Create a new empty function.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: vec![],
            dfg: DataFlowGraph::new(),
            layout: FunctionLayout::default(),
        }
    }

    /// Get the name of the function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the function's data flow graph.
    pub fn dfg(&self) -> &DataFlowGraph {
        &self.dfg
    }

    /// Get the function's block and instruction layout.
    pub fn layout(&self) -> &FunctionLayout {
        &self.layout
    }

    /// Get the argument values of the function.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Return an iterator over the function's blocks in layout order.
    pub fn blocks<'a>(&'a self) -> impl DoubleEndedIterator<Item = Block> + 'a {
        self.layout.blocks()
    }

    /// Get the entry block of the function, if it has any blocks.
    pub fn entry(&self) -> Option<Block> {
        self.layout.entry()
    }

    /// Check whether a block exists in the function.
    pub fn has_block(&self, bb: Block) -> bool {
        self.layout.blocks.contains(bb)
    }

    /// Get the name of a block.
    pub fn block_name(&self, bb: Block) -> Option<&str> {
        self.layout[bb].name.as_ref().map(AsRef::as_ref)
    }

    /// Get the parameters of a block.
    pub fn block_params(&self, bb: Block) -> &[Value] {
        &self.layout[bb].params
    }

    /// Return an iterator over the instructions of a block in order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl DoubleEndedIterator<Item = Inst> + 'a {
        self.layout.insts(bb)
    }

    /// Return an iterator over all instructions of the function.
    pub fn all_insts<'a>(&'a self) -> impl Iterator<Item = Inst> + 'a {
        self.blocks().flat_map(move |bb| self.insts(bb))
    }

    /// Count the instructions in the function.
    pub fn num_insts(&self) -> usize {
        self.dfg.insts.len()
    }

    /// Get the first instruction of a block.
    pub fn first_inst(&self, bb: Block) -> Option<Inst> {
        self.layout.first_inst(bb)
    }

    /// Get the last instruction of a block.
    pub fn last_inst(&self, bb: Block) -> Option<Inst> {
        self.layout.last_inst(bb)
    }

    /// Get the block that contains an instruction.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.layout.inst_block(inst)
    }

    /// Get the ordinal position of an instruction within its block.
    pub fn inst_position(&self, inst: Inst) -> Option<usize> {
        self.inst_block(inst)
            .map(|bb| self.layout.inst_position(bb, inst))
    }

    /// Get the instruction at a position within a block.
    pub fn inst_at(&self, bb: Block, pos: usize) -> Option<Inst> {
        self.layout[bb].insts.get(pos).cloned()
    }

    /// Get the terminator of a block, if it has one.
    pub fn terminator(&self, bb: Block) -> Option<Inst> {
        self.last_inst(bb)
            .filter(|&inst| self[inst].opcode().is_terminator())
    }

    /// Return the successors of a block, as named by its terminator.
    ///
    /// A block without a terminator, or ending in a return, has no successors.
    pub fn succs(&self, bb: Block) -> Vec<Block> {
        let mut succs = vec![];
        if let Some(term) = self.terminator(bb) {
            for target in self[term].blocks() {
                if !succs.contains(&target) {
                    succs.push(target);
                }
            }
        }
        succs
    }

    /// Check whether an instruction produces a result.
    pub fn has_result(&self, inst: Inst) -> bool {
        self.dfg.has_result(inst)
    }

    /// Get the result of an instruction.
    pub fn inst_result(&self, inst: Inst) -> Value {
        self.dfg.inst_result(inst)
    }

    /// Get the result of an instruction, if it has one.
    pub fn get_inst_result(&self, inst: Inst) -> Option<Value> {
        self.dfg.get_inst_result(inst)
    }

    /// Get the instruction which defines a value.
    pub fn get_value_inst(&self, value: Value) -> Option<Inst> {
        self.dfg.get_value_inst(value)
    }

    /// Get the name of a value.
    pub fn get_name(&self, value: Value) -> Option<&str> {
        self.dfg.get_name(value)
    }

    /// Return an upper bound on value indices, for sizing bit sets.
    pub fn value_id_bound(&self) -> usize {
        self.dfg.value_id_bound()
    }

    /// Return an upper bound on block indices, for sizing bit sets.
    pub fn block_id_bound(&self) -> usize {
        self.layout.block_id_bound()
    }

    /// Remove an instruction from the function.
    ///
    /// The instruction's result value is removed as well. Returns the removed
    /// instruction's data.
    pub fn remove_inst(&mut self, inst: Inst) -> InstData {
        self.layout.remove_inst(inst);
        self.dfg.remove_inst(inst)
    }

    /// Remove the instruction at a position within a block.
    pub fn remove_inst_at(&mut self, bb: Block, pos: usize) -> Option<InstData> {
        let inst = self.inst_at(bb, pos)?;
        Some(self.remove_inst(inst))
    }
}

/// A mutable function.
pub struct FunctionBuilder<'a> {
    func: &'a mut Function,
    pos: Option<Block>,
}

impl Deref for FunctionBuilder<'_> {
    type Target = Function;

    fn deref(&self) -> &Function {
        self.func
    }
}

impl DerefMut for FunctionBuilder<'_> {
    fn deref_mut(&mut self) -> &mut Function {
        self.func
    }
}

impl<'a> FunctionBuilder<'a> {
    /// Create a new builder for a function.
    pub fn new(func: &'a mut Function) -> Self {
        Self { func, pos: None }
    }

    /// Add a new instruction using an `InstBuilder`.
    pub fn ins<'b>(&'b mut self) -> InstBuilder<'a, 'b> {
        InstBuilder::new(self)
    }

    /// Add a new instruction at the current insertion point.
    ///
    /// Panics if no block has been selected with `append_to`.
    pub fn build_inst(&mut self, data: InstData, has_result: bool) -> Inst {
        let bb = self.pos.expect("no block selected for insertion");
        let inst = self.func.dfg.add_inst(data, has_result);
        self.func.layout.append_inst(inst, bb);
        inst
    }

    /// Add a new argument to the function.
    pub fn add_arg(&mut self) -> Value {
        let index = self.func.args.len();
        let value = self.func.dfg.add_value(ValueData::Arg { index });
        self.func.args.push(value);
        value
    }

    /// Add a new named argument to the function.
    pub fn named_arg(&mut self, name: impl Into<String>) -> Value {
        let value = self.add_arg();
        self.set_name(value, name.into());
        value
    }

    /// Create a new BB at the end of the layout.
    pub fn block(&mut self) -> Block {
        self.func.layout.append_block(BlockData::default())
    }

    /// Create a new named BB at the end of the layout.
    pub fn named_block(&mut self, name: impl Into<String>) -> Block {
        self.func.layout.append_block(BlockData {
            name: Some(name.into()),
            ..Default::default()
        })
    }

    /// Add a parameter to a BB.
    pub fn add_block_param(&mut self, bb: Block) -> Value {
        let index = self.func.layout[bb].params.len();
        let value = self
            .func
            .dfg
            .add_value(ValueData::Param { block: bb, index });
        self.func.layout[bb].params.push(value);
        value
    }

    /// Add a named parameter to a BB.
    pub fn named_block_param(&mut self, bb: Block, name: impl Into<String>) -> Value {
        let value = self.add_block_param(bb);
        self.set_name(value, name.into());
        value
    }

    /// Create a value that is used but has no definition.
    pub fn undef(&mut self) -> Value {
        self.func.dfg.add_value(ValueData::Undef)
    }

    /// Set the name of a value.
    pub fn set_name(&mut self, value: Value, name: String) {
        self.func.dfg.set_name(value, name);
    }

    /// Set the name of a BB.
    pub fn set_block_name(&mut self, bb: Block, name: String) {
        self.func.layout[bb].name = Some(name);
    }

    /// Append all following instructions to the end of `bb`.
    pub fn append_to(&mut self, bb: Block) {
        self.pos = Some(bb);
    }
}

impl Value {
    /// Dump the value in human readable form.
    pub fn dump(self, func: &Function) -> ValueDumper {
        ValueDumper(self, func)
    }
}

/// Temporary object to dump a `Value` in human-readable form for debugging.
pub struct ValueDumper<'a>(Value, &'a Function);

impl std::fmt::Display for ValueDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.1.get_name(self.0) {
            Some(name) => write!(f, "%{}", name),
            None => write!(f, "%{}", crate::table::TableKey::index(self.0)),
        }
    }
}

impl Block {
    /// Dump the basic block in human readable form.
    pub fn dump(self, func: &Function) -> BlockDumper {
        BlockDumper(self, func)
    }
}

/// Temporary object to dump a `Block` in human-readable form for debugging.
pub struct BlockDumper<'a>(Block, &'a Function);

impl std::fmt::Display for BlockDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let func = self.1;
        let name = if func.has_block(self.0) {
            func.block_name(self.0)
        } else {
            None
        };
        match name {
            Some(name) => write!(f, "%{}", name),
            None => write!(f, "%{}", self.0),
        }
    }
}
