// Copyright (c) 2017-2021 Fabian Schuiki

//! Verification of IR integrity.
//!
//! This module implements verification of the intermediate representation. It
//! checks that functions have an entry block, basic blocks have terminators,
//! instructions carry the operands their opcode requires, and branches pass
//! one argument per parameter of their target.

use crate::ir::{prelude::*, ValueData};
use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
};

/// An IR verifier.
///
/// The `Verifier` acts as a context to call the various IR checking functions
/// on. It keeps track of errors.
#[derive(Default)]
pub struct Verifier {
    errors: VerifierErrors,
    func_name: Option<String>,
}

impl Verifier {
    /// Create a new verifier.
    pub fn new() -> Self {
        Default::default()
    }

    /// Verify the integrity of a `Module`.
    pub fn verify_module(&mut self, module: &Module) {
        for func in module.functions() {
            self.verify_function(func);
        }
    }

    /// Verify the integrity of a `Function`.
    pub fn verify_function(&mut self, func: &Function) {
        self.func_name = Some(format!("func @{}", func.name()));
        if func.entry().is_none() {
            self.error(None, "layout has no entry block");
        }
        for bb in func.blocks() {
            // Check that the block has at least one instruction.
            if func.first_inst(bb).is_none() {
                self.error(Some(bb.dump(func).to_string()), "block is empty");
            }

            for inst in func.insts(bb) {
                let is_last = Some(inst) == func.last_inst(bb);
                let is_terminator = func[inst].opcode().is_terminator();
                if is_terminator && !is_last {
                    self.error(
                        Some(inst.dump(func).to_string()),
                        format!("terminator must be at the end of block {}", bb.dump(func)),
                    );
                }
                if is_last && !is_terminator {
                    self.error(
                        Some(bb.dump(func).to_string()),
                        format!(
                            "last instruction `{}` must be a terminator",
                            inst.dump(func)
                        ),
                    );
                }
                self.verify_inst(inst, func);
            }
        }
        self.func_name = None;
    }

    /// Finish verification and return the result.
    ///
    /// Consumes the verifier.
    pub fn finish(self) -> Result<(), VerifierErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Finish verification and panic if errors occurred.
    ///
    /// Consumes the verifier.
    pub fn finish_panic(self) {
        match self.finish() {
            Ok(()) => (),
            Err(errs) => panic!("Verification failed:\n{}", errs),
        }
    }

    /// Verify the integrity of a single instruction.
    pub fn verify_inst(&mut self, inst: Inst, func: &Function) {
        InstVerifier {
            verifier: self,
            func,
        }
        .verify_inst(inst);
    }

    fn error(&mut self, object: Option<String>, message: impl Into<String>) {
        self.errors.push(VerifierError {
            function: self.func_name.clone(),
            object,
            message: message.into(),
        });
    }
}

/// An instruction verifier.
struct InstVerifier<'a> {
    verifier: &'a mut Verifier,
    func: &'a Function,
}

impl<'a> Deref for InstVerifier<'a> {
    type Target = Verifier;
    fn deref(&self) -> &Verifier {
        self.verifier
    }
}

impl<'a> DerefMut for InstVerifier<'a> {
    fn deref_mut(&mut self) -> &mut Verifier {
        self.verifier
    }
}

impl<'a> InstVerifier<'a> {
    fn verify_inst(&mut self, inst: Inst) {
        let func = self.func;
        let data = &func[inst];
        let opcode = data.opcode();
        let object = || Some(inst.dump(func).to_string());

        let (num_args, num_targets, result) = match opcode {
            Opcode::Const | Opcode::Alloca => (Some(0), 0, Some(true)),
            Opcode::Load => (Some(1), 0, Some(true)),
            Opcode::Store => (Some(2), 0, Some(false)),
            Opcode::Call => (None, 0, None),
            Opcode::Br => (Some(0), 1, Some(false)),
            Opcode::BrCond => (Some(1), 2, Some(false)),
            Opcode::Ret | Opcode::Unreachable => (Some(0), 0, Some(false)),
            Opcode::RetValue => (Some(1), 0, Some(false)),
            op if op.is_unary() => (Some(1), 0, Some(true)),
            _ => (Some(2), 0, Some(true)),
        };

        if let Some(n) = num_args {
            if data.args().len() != n {
                self.error(
                    object(),
                    format!("{} requires {} operands, has {}", opcode, n, data.args().len()),
                );
            }
        }
        if data.targets().len() != num_targets {
            self.error(
                object(),
                format!(
                    "{} requires {} targets, has {}",
                    opcode,
                    num_targets,
                    data.targets().len()
                ),
            );
        }
        match result {
            Some(true) if !func.has_result(inst) => {
                self.error(object(), format!("{} must produce a result", opcode))
            }
            Some(false) if func.has_result(inst) => {
                self.error(object(), format!("{} cannot produce a result", opcode))
            }
            _ => (),
        }
        match (opcode == Opcode::Const, data.imm().is_some()) {
            (true, false) => self.error(object(), "const requires an immediate"),
            (false, true) => self.error(object(), format!("{} cannot carry an immediate", opcode)),
            _ => (),
        }
        match (opcode == Opcode::Call, data.callee().is_some()) {
            (true, false) => self.error(object(), "call requires a callee"),
            (false, true) => self.error(object(), format!("{} cannot name a callee", opcode)),
            _ => (),
        }

        for target in data.targets() {
            if !func.has_block(target.block) {
                self.error(
                    object(),
                    format!("branch to nonexistent block {}", target.block),
                );
                continue;
            }
            let params = func.block_params(target.block).len();
            if target.args.len() != params {
                self.error(
                    object(),
                    format!(
                        "{} expects {} arguments, {} given",
                        target.block.dump(func),
                        params,
                        target.args.len()
                    ),
                );
            }
        }

        for value in data.uses() {
            if !func.dfg().has_value(value) {
                self.error(object(), format!("uses removed value {}", value));
            } else if func[value] == ValueData::Undef {
                self.error(
                    object(),
                    format!("uses undefined value {}", value.dump(func)),
                );
            }
        }
    }
}

/// A verification error.
#[derive(Debug)]
pub struct VerifierError {
    /// The function within which the error occurred.
    pub function: Option<String>,
    /// The object which caused the error.
    pub object: Option<String>,
    /// The error message.
    pub message: String,
}

impl Display for VerifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(ref function) = self.function {
            write!(f, "{}: ", function)?;
        }
        if let Some(ref object) = self.object {
            write!(f, "{}: ", object)?;
        }
        write!(f, "{}", self.message)?;
        Ok(())
    }
}

/// A list of verification errors.
#[derive(Debug, Default)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl Deref for VerifierErrors {
    type Target = Vec<VerifierError>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for VerifierErrors {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for VerifierErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for err in self.iter() {
            writeln!(f, "- {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for VerifierErrors {}
