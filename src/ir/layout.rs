// Copyright (c) 2017-2021 Fabian Schuiki

//! Instruction and BB ordering.

use crate::{
    impl_table_indexing,
    ir::{Block, Inst, Value},
    table::PrimaryTable,
};
use std::collections::HashMap;

/// A basic block.
#[derive(Default, Debug, Clone)]
pub struct BlockData {
    /// The name of the block.
    pub name: Option<String>,
    /// The parameters of the block, bound by incoming branches.
    pub params: Vec<Value>,
    /// The instructions in the block, in execution order.
    pub(super) insts: Vec<Inst>,
}

/// Determines the order of instructions and BBs in a `Function`.
#[derive(Default, Debug, Clone)]
pub struct FunctionLayout {
    /// The basic blocks.
    pub(super) blocks: PrimaryTable<Block, BlockData>,
    /// The BBs in layout order. The first one is the entry.
    pub(super) order: Vec<Block>,
    /// Lookup table to find the BB that contains an instruction.
    pub(super) inst_map: HashMap<Inst, Block>,
}

impl_table_indexing!(FunctionLayout, blocks, Block, BlockData);

impl FunctionLayout {
    /// Create a new BB at the end of the layout.
    pub(super) fn append_block(&mut self, data: BlockData) -> Block {
        let bb = self.blocks.add(data);
        self.order.push(bb);
        bb
    }

    /// Return an iterator over all BBs in layout order.
    pub fn blocks<'a>(&'a self) -> impl DoubleEndedIterator<Item = Block> + 'a {
        self.order.iter().cloned()
    }

    /// Get the first BB in the layout, which is the entry point.
    pub fn entry(&self) -> Option<Block> {
        self.order.first().cloned()
    }

    /// Return an iterator over the instructions of a BB in layout order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl DoubleEndedIterator<Item = Inst> + 'a {
        self.blocks[bb].insts.iter().cloned()
    }

    /// Get the first instruction in a BB.
    pub fn first_inst(&self, bb: Block) -> Option<Inst> {
        self.blocks[bb].insts.first().cloned()
    }

    /// Get the last instruction in a BB.
    pub fn last_inst(&self, bb: Block) -> Option<Inst> {
        self.blocks[bb].insts.last().cloned()
    }

    /// Append an instruction to the end of a BB.
    pub(super) fn append_inst(&mut self, inst: Inst, bb: Block) {
        if let Some(old_bb) = self.inst_map.insert(inst, bb) {
            panic!(
                "inst {} already inserted in {}, now being inserted into {}",
                inst, old_bb, bb
            );
        }
        self.blocks[bb].insts.push(inst);
    }

    /// Remove an instruction from the layout.
    ///
    /// Returns the BB the instruction was in and its former position.
    pub(super) fn remove_inst(&mut self, inst: Inst) -> (Block, usize) {
        let bb = match self.inst_map.remove(&inst) {
            Some(bb) => bb,
            None => panic!("inst {} was not inserted", inst),
        };
        let pos = self.inst_position(bb, inst);
        self.blocks[bb].insts.remove(pos);
        (bb, pos)
    }

    /// Get the BB which contains `inst`.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_map.get(&inst).cloned()
    }

    /// Get the ordinal position of `inst` within `bb`.
    pub(super) fn inst_position(&self, bb: Block, inst: Inst) -> usize {
        self.blocks[bb]
            .insts
            .iter()
            .position(|&i| i == inst)
            .expect("inst not in its block")
    }

    /// Return an upper bound on the block indices in the layout.
    pub fn block_id_bound(&self) -> usize {
        self.blocks.id_bound()
    }
}
