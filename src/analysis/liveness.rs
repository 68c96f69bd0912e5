// Copyright (c) 2017-2021 Fabian Schuiki

//! Backward liveness analysis.

use crate::{
    analysis::PredecessorTable,
    ir::prelude::*,
    table::{SecondaryTable, TableKey},
};
use hibitset::{BitSet, BitSetLike};
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
};

/// The live values at the boundaries of each basic block.
///
/// For every block `B` reachable from the entry, the sets satisfy
///
/// ```text
/// live-out(B) = union of live-in(S) over all successors S of B
/// live-in(B)  = (live-out(B) - defs(B)) + upward-exposed uses(B)
/// ```
///
/// Blocks that cannot be reached are not analyzed. The values they use are
/// recorded as pinned instead, and must be considered live everywhere. The
/// same holds for values live on entry to the function: some use of them is
/// not reached by their definition.
#[derive(Debug, Clone)]
pub struct Liveness {
    live_in: SecondaryTable<Block, BitSet>,
    live_out: SecondaryTable<Block, BitSet>,
    pinned: BitSet,
    visits: usize,
}

impl Liveness {
    /// Compute the liveness of the values in a function.
    ///
    /// Iterates a worklist of blocks to a fixed point, starting from empty
    /// sets. The worklist is seeded in post-order such that successors tend to
    /// be visited before their predecessors. Whenever the live-in set of a
    /// block grows, its predecessors are queued again. Since the sets only
    /// ever grow and the number of values is finite, this terminates.
    pub fn compute(func: &Function, pt: &PredecessorTable) -> Self {
        let t0 = time::precise_time_ns();
        let mut live_in = SecondaryTable::new();
        let mut live_out = SecondaryTable::new();
        let mut worklist = VecDeque::new();
        let mut queued = BitSet::with_capacity(func.block_id_bound() as u32);
        for &bb in pt.blocks_post_order() {
            live_in.add(bb, BitSet::new());
            live_out.add(bb, BitSet::new());
            worklist.push_back(bb);
            queued.add(bb.index() as u32);
        }

        let num_values = func.value_id_bound() as u32;
        let mut pinned = BitSet::with_capacity(num_values);
        for bb in func.blocks().filter(|&bb| !pt.is_reachable(bb)) {
            for inst in func.insts(bb) {
                for value in func[inst].uses() {
                    pinned.add(value_key(value));
                }
            }
        }

        let mut visits = 0;
        while let Some(bb) = worklist.pop_front() {
            queued.remove(bb.index() as u32);
            visits += 1;

            let mut live = BitSet::with_capacity(num_values);
            for succ in pt.succ(bb) {
                if let Some(succ_in) = live_in.get(succ) {
                    union_with(&mut live, succ_in);
                }
            }
            live_out[bb] = live.clone();
            transfer_block(func, bb, &mut live);

            let grown = (&live).iter().any(|v| !live_in[bb].contains(v));
            if grown {
                trace!("  {} live-in grew", bb.dump(func));
                live_in[bb] = live;
                for pred in pt.pred(bb).filter(|&pred| pt.is_reachable(pred)) {
                    if !queued.add(pred.index() as u32) {
                        worklist.push_back(pred);
                    }
                }
            }
        }
        // Uses without a reaching definition.
        if let Some(entry_in) = func.entry().and_then(|bb| live_in.get(bb)) {
            union_with(&mut pinned, entry_in);
        }

        debug!(
            "Liveness of {} converged after {} block visits",
            func.name(),
            visits
        );
        let t1 = time::precise_time_ns();
        LIVENESS_TIME.fetch_add(t1 - t0, Ordering::Relaxed);

        Self {
            live_in,
            live_out,
            pinned,
            visits,
        }
    }

    /// Check whether a block was analyzed.
    pub fn is_analyzed(&self, bb: Block) -> bool {
        self.live_in.contains(bb)
    }

    /// Get the set of value keys live on entry to a block.
    pub fn live_in_set(&self, bb: Block) -> Option<&BitSet> {
        self.live_in.get(bb)
    }

    /// Get the set of value keys live on exit from a block.
    pub fn live_out_set(&self, bb: Block) -> Option<&BitSet> {
        self.live_out.get(bb)
    }

    /// Get the values live on entry to a block, ordered by id.
    pub fn live_in(&self, bb: Block) -> Vec<Value> {
        self.live_in.get(bb).map(values_of).unwrap_or_default()
    }

    /// Get the values live on exit from a block, ordered by id.
    pub fn live_out(&self, bb: Block) -> Vec<Value> {
        self.live_out.get(bb).map(values_of).unwrap_or_default()
    }

    /// Check whether a value is live on entry to a block.
    pub fn is_live_in(&self, bb: Block, value: Value) -> bool {
        self.live_in
            .get(bb)
            .map(|set| set.contains(value_key(value)))
            .unwrap_or(false)
    }

    /// Check whether a value is live on exit from a block.
    pub fn is_live_out(&self, bb: Block, value: Value) -> bool {
        self.live_out
            .get(bb)
            .map(|set| set.contains(value_key(value)))
            .unwrap_or(false)
    }

    /// Check whether a value is used by code the analysis did not cover.
    pub fn is_pinned(&self, value: Value) -> bool {
        self.pinned.contains(value_key(value))
    }

    /// Get the set of value keys used by code the analysis did not cover.
    pub fn pinned_set(&self) -> &BitSet {
        &self.pinned
    }

    /// Get the number of block visits the fixed-point iteration needed.
    pub fn visits(&self) -> usize {
        self.visits
    }
}

/// Apply the backward transfer function of an instruction to a live set.
///
/// The instruction's result dies above the instruction, its operands are
/// live above it.
pub fn transfer_inst(func: &Function, inst: Inst, live: &mut BitSet) {
    if let Some(result) = func.get_inst_result(inst) {
        live.remove(value_key(result));
    }
    for value in func[inst].uses() {
        live.add(value_key(value));
    }
}

/// Apply the backward transfer function of an entire block to a live set.
///
/// Turns the set of values live on exit into the set of values live on entry.
/// Block parameters are defined on entry.
pub fn transfer_block(func: &Function, bb: Block, live: &mut BitSet) {
    for inst in func.insts(bb).rev() {
        transfer_inst(func, inst, live);
    }
    for &param in func.block_params(bb) {
        live.remove(value_key(param));
    }
}

/// Map a value to its key in a liveness bit set.
pub fn value_key(value: Value) -> u32 {
    value.index() as u32
}

/// Add all elements of `other` to `set`.
pub fn union_with(set: &mut BitSet, other: &BitSet) {
    for key in other.iter() {
        set.add(key);
    }
}

fn values_of(set: &BitSet) -> Vec<Value> {
    set.iter().map(|key| Value::new(key as usize)).collect()
}

/// Total time spent computing liveness, in nanoseconds.
pub static LIVENESS_TIME: AtomicU64 = AtomicU64::new(0);
