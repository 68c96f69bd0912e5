// Copyright (c) 2017-2021 Fabian Schuiki

use crate::{ir::prelude::*, table::TableKey};
use hibitset::BitSet;
use std::collections::HashMap;

/// A table of basic block predecessors.
///
/// Captures the control flow edges of a function as named by the block
/// terminators, which blocks can be reached from the entry, and a post-order
/// of the reachable blocks.
#[derive(Debug, Clone)]
pub struct PredecessorTable {
    pred: HashMap<Block, Vec<Block>>,
    succ: HashMap<Block, Vec<Block>>,
    reachable: BitSet,
    post_order: Vec<Block>,
}

impl PredecessorTable {
    /// Compute the predecessor table for a function.
    ///
    /// Branches to blocks which are not part of the function are ignored.
    pub fn new(func: &Function) -> Self {
        let mut pred: HashMap<Block, Vec<Block>> = HashMap::new();
        let mut succ = HashMap::new();
        for bb in func.blocks() {
            pred.insert(bb, vec![]);
        }
        for bb in func.blocks() {
            let to_bbs: Vec<_> = func
                .succs(bb)
                .into_iter()
                .filter(|&to_bb| func.has_block(to_bb))
                .collect();
            for &to_bb in &to_bbs {
                if let Some(preds) = pred.get_mut(&to_bb) {
                    preds.push(bb);
                }
            }
            succ.insert(bb, to_bbs);
        }

        let mut table = Self {
            pred,
            succ,
            reachable: BitSet::new(),
            post_order: vec![],
        };
        if let Some(entry) = func.entry() {
            table.compute_post_order(entry);
        }
        table
    }

    fn compute_post_order(&mut self, entry: Block) {
        let mut order = Vec::with_capacity(self.succ.len());
        let mut stack = Vec::with_capacity(8);
        let mut finished = BitSet::new();
        stack.push(entry);

        while let Some(&next) = stack.last() {
            if !self.reachable.add(next.index() as u32) {
                for &succ in &self.succ[&next] {
                    if !self.reachable.contains(succ.index() as u32) {
                        stack.push(succ);
                    }
                }
            } else {
                stack.pop();
                if !finished.add(next.index() as u32) {
                    order.push(next);
                }
            }
        }

        self.post_order = order;
    }

    /// Get the predecessors of a block.
    pub fn pred_set(&self, bb: Block) -> &[Block] {
        &self.pred[&bb]
    }

    /// Get the successors of a block.
    pub fn succ_set(&self, bb: Block) -> &[Block] {
        &self.succ[&bb]
    }

    /// Get the predecessors of a block.
    pub fn pred(&self, bb: Block) -> impl Iterator<Item = Block> + Clone + '_ {
        self.pred[&bb].iter().cloned()
    }

    /// Get the successors of a block.
    pub fn succ(&self, bb: Block) -> impl Iterator<Item = Block> + Clone + '_ {
        self.succ[&bb].iter().cloned()
    }

    /// Check if a block can be reached from the entry block.
    pub fn is_reachable(&self, bb: Block) -> bool {
        self.reachable.contains(bb.index() as u32)
    }

    /// Get the reachable blocks in post-order.
    ///
    /// Every block appears after all of its successors, except along back
    /// edges.
    pub fn blocks_post_order(&self) -> &[Block] {
        &self.post_order
    }
}
