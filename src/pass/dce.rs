// Copyright (c) 2017-2021 Fabian Schuiki

//! Dead Code Elimination

use crate::{
    analysis::{transfer_inst, union_with, value_key, Liveness, PredecessorTable},
    ir::prelude::*,
    pass::{Pass, PassContext},
};
use hibitset::BitSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dead Code Elimination
///
/// This pass implements dead code elimination based on an iterative liveness
/// analysis. It removes instructions without side effects whose result is not
/// live after the instruction. Removing an instruction may render the
/// instructions computing its operands dead as well, so liveness is recomputed
/// and the process repeated until no more instructions can be removed.
///
/// Blocks that cannot be reached from the entry are left untouched, and the
/// values they use are kept alive.
pub struct DeadCodeElim;

impl DeadCodeElim {
    /// The name under which the pass is registered.
    pub const NAME: &'static str = "live";

    /// The description under which the pass is registered.
    pub const DESCRIPTION: &'static str = "Iterative Liveness Analysis dead code elimination";

    /// Eliminate dead code in a function and report what was done.
    pub fn run(ctx: &PassContext, func: &mut Function) -> DceStats {
        let mut stats = DceStats::default();
        let mut state = State::Start;
        loop {
            trace!("DCE [{}] {}", func.name(), state.name());
            state = match state {
                State::Start => {
                    info!("DCE [{}]", func.name());
                    State::BuildCfg
                }
                State::BuildCfg => State::ComputeLiveness(PredecessorTable::new(func)),
                State::ComputeLiveness(pt) => {
                    stats.rounds += 1;
                    let liveness = Liveness::compute(func, &pt);
                    State::IdentifyDead(pt, liveness)
                }
                State::IdentifyDead(pt, liveness) => {
                    let dead = find_dead_insts(func, &liveness);
                    if dead.is_empty() {
                        State::Done
                    } else {
                        State::Eliminate(pt, dead)
                    }
                }
                State::Eliminate(pt, dead) => {
                    let removed = remove_dead_insts(func, &dead);
                    debug!(
                        "DCE [{}] round {} removed {} instructions",
                        func.name(),
                        stats.rounds,
                        removed
                    );
                    stats.removed += removed;
                    if removed == 0 {
                        State::Done
                    } else {
                        State::ComputeLiveness(pt)
                    }
                }
                State::Done => break,
            };
        }
        info!(
            "DCE [{}] removed {} instructions in {} rounds",
            func.name(),
            stats.removed,
            stats.rounds
        );
        ctx.emit(format!("my DCE  for function: {}!", func.name()));
        stats
    }
}

impl Pass for DeadCodeElim {
    fn run_on_function(ctx: &PassContext, func: &mut Function) -> bool {
        Self::run(ctx, func).modified()
    }
}

/// The outcome of running dead code elimination on a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DceStats {
    /// The number of times liveness was computed.
    pub rounds: usize,
    /// The number of instructions removed.
    pub removed: usize,
}

impl DceStats {
    /// Check whether the function was modified.
    pub fn modified(&self) -> bool {
        self.removed > 0
    }
}

/// The steps taken by `DeadCodeElim::run`.
///
/// The control flow graph does not change across rounds, since terminators
/// are never removed. It is therefore built once and carried along.
enum State {
    Start,
    BuildCfg,
    ComputeLiveness(PredecessorTable),
    IdentifyDead(PredecessorTable, Liveness),
    Eliminate(PredecessorTable, Vec<Inst>),
    Done,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Start => "start",
            State::BuildCfg => "build cfg",
            State::ComputeLiveness(..) => "compute liveness",
            State::IdentifyDead(..) => "identify dead",
            State::Eliminate(..) => "eliminate",
            State::Done => "done",
        }
    }
}

/// Find the instructions that can be removed from a function.
///
/// Walks every analyzed block backwards, starting from its live-out set. An
/// instruction without side effects whose result is not live at that point is
/// dead. Its operands are not marked live, such that chains of dead
/// instructions within a block are found in one sweep.
pub fn find_dead_insts(func: &Function, liveness: &Liveness) -> Vec<Inst> {
    let mut dead = vec![];
    for bb in func.blocks().filter(|&bb| liveness.is_analyzed(bb)) {
        let mut live = liveness
            .live_out_set(bb)
            .cloned()
            .unwrap_or_else(BitSet::new);
        union_with(&mut live, liveness.pinned_set());
        for inst in func.insts(bb).rev() {
            let used = func
                .get_inst_result(inst)
                .map(|result| live.contains(value_key(result)))
                .unwrap_or(false);
            if !used && !func[inst].has_side_effects() {
                trace!("Found dead {}", inst.dump(func));
                dead.push(inst);
            } else {
                transfer_inst(func, inst, &mut live);
            }
        }
    }
    dead
}

/// Remove dead instructions from a function.
///
/// Instructions with side effects are never removed, even if listed. Returns
/// the number of instructions removed.
pub fn remove_dead_insts(func: &mut Function, dead: &[Inst]) -> usize {
    let mut removed = 0;
    for &inst in dead {
        if func[inst].has_side_effects() {
            warn!("Refusing to remove {}", inst.dump(func));
            continue;
        }
        debug!("Removing {}", inst.dump(func));
        func.remove_inst(inst);
        removed += 1;
    }
    INSTS_REMOVED.fetch_add(removed as u64, Ordering::Relaxed);
    removed
}

/// Total number of instructions removed by dead code elimination.
pub static INSTS_REMOVED: AtomicU64 = AtomicU64::new(0);
