// Copyright (c) 2017-2019 Fabian Schuiki

//! Representation of the data flow in a `Function`.
//!
//! Each function has an associated `DataFlowGraph` which contains all the
//! values, instructions, and the links between them.

use crate::{
    impl_table_indexing,
    ir::{Inst, InstData, Value, ValueData},
    table::{PrimaryTable, SecondaryTable},
};
use std::collections::HashMap;

/// A data flow graph.
///
/// This is the main container for instructions, values, and the relationship
/// between them.
#[derive(Default, Debug, Clone)]
pub struct DataFlowGraph {
    /// The instructions in the graph.
    pub(crate) insts: PrimaryTable<Inst, InstData>,
    /// The result values produced by instructions.
    pub(crate) results: SecondaryTable<Inst, Value>,
    /// The values in the graph.
    pub(crate) values: PrimaryTable<Value, ValueData>,
    /// The names assigned to values.
    pub(crate) names: HashMap<Value, String>,
}

impl_table_indexing!(DataFlowGraph, insts, Inst, InstData);
impl_table_indexing!(DataFlowGraph, values, Value, ValueData);

impl DataFlowGraph {
    /// Create a new data flow graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a value that is not produced by an instruction.
    pub(crate) fn add_value(&mut self, data: ValueData) -> Value {
        self.values.add(data)
    }

    /// Add an instruction, optionally with a result value.
    pub(crate) fn add_inst(&mut self, data: InstData, has_result: bool) -> Inst {
        let inst = self.insts.add(data);
        if has_result {
            let result = self.values.add(ValueData::Inst { inst });
            self.results.add(inst, result);
        }
        inst
    }

    /// Remove an instruction and its result value.
    pub(crate) fn remove_inst(&mut self, inst: Inst) -> InstData {
        if let Some(value) = self.results.remove(inst) {
            self.values.remove(value);
            self.names.remove(&value);
        }
        self.insts.remove(inst)
    }

    /// Remove a value that is not produced by an instruction.
    pub(crate) fn remove_value(&mut self, value: Value) {
        self.values.remove(value);
        self.names.remove(&value);
    }

    /// Replace all uses of a value with another.
    ///
    /// Returns the number of operands that were changed.
    pub(crate) fn replace_use(&mut self, from: Value, to: Value) -> usize {
        self.insts
            .iter_mut()
            .map(|(_, data)| data.replace_use(from, to))
            .sum()
    }

    /// Returns whether an instruction produces a result.
    pub fn has_result(&self, inst: Inst) -> bool {
        self.results.contains(inst)
    }

    /// Returns the result of an instruction.
    pub fn inst_result(&self, inst: Inst) -> Value {
        self.results[inst]
    }

    /// Returns the result of an instruction, if it has one.
    pub fn get_inst_result(&self, inst: Inst) -> Option<Value> {
        self.results.get(inst).cloned()
    }

    /// Return the instruction that produces `value`.
    pub fn get_value_inst(&self, value: Value) -> Option<Inst> {
        match self.values.get(value) {
            Some(&ValueData::Inst { inst }) => Some(inst),
            _ => None,
        }
    }

    /// Check whether a value exists in the graph.
    pub fn has_value(&self, value: Value) -> bool {
        self.values.contains(value)
    }

    /// Return the name of a value.
    pub fn get_name(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(AsRef::as_ref)
    }

    /// Set the name of a value.
    pub fn set_name(&mut self, value: Value, name: String) {
        self.names.insert(value, name);
    }

    /// Return an upper bound on the value indices in the graph.
    pub fn value_id_bound(&self) -> usize {
        self.values.id_bound()
    }
}
