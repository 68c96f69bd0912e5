// Copyright (c) 2017-2021 Fabian Schuiki

//! Emitting assembly.

use crate::ir::{Block, Function, Inst, InstFlags, Module, Value};
use std::{
    collections::{HashMap, HashSet},
    io::{Result, Write},
    rc::Rc,
};

/// Temporary object to emit assembly.
pub struct Writer<T> {
    sink: T,
}

impl<T: Write> Writer<T> {
    /// Create a new assembly writer.
    pub fn new(sink: T) -> Self {
        Self { sink }
    }

    /// Emit assembly for a module.
    pub fn write_module(&mut self, module: &Module) -> Result<()> {
        let mut separate = false;
        for func in module.functions() {
            if separate {
                write!(self.sink, "\n")?;
            }
            separate = true;
            self.write_function(func)?;
        }
        Ok(())
    }

    /// Emit assembly for a function.
    pub fn write_function(&mut self, func: &Function) -> Result<()> {
        let mut fw = FunctionWriter::new(self, func);
        write!(fw.writer.sink, "func @{} (", func.name())?;
        fw.write_value_list(func.args())?;
        write!(fw.writer.sink, ") {{\n")?;
        for block in func.blocks() {
            fw.write_block_name(block)?;
            if !func.block_params(block).is_empty() {
                write!(fw.writer.sink, "(")?;
                fw.write_value_list(func.block_params(block))?;
                write!(fw.writer.sink, ")")?;
            }
            write!(fw.writer.sink, ":\n")?;
            for inst in func.insts(block) {
                write!(fw.writer.sink, "    ")?;
                fw.write_inst(inst)?;
                write!(fw.writer.sink, "\n")?;
            }
        }
        write!(fw.writer.sink, "}}\n")?;
        Ok(())
    }
}

/// Emit a module as an assembly string.
pub fn write_string(module: &Module) -> String {
    let mut asm = vec![];
    // Writing to a `Vec` cannot fail.
    let _ = Writer::new(&mut asm).write_module(module);
    String::from_utf8_lossy(&asm).into_owned()
}

/// Emit a module as assembly into `sink`.
pub fn write_module(sink: impl Write, module: &Module) -> Result<()> {
    Writer::new(sink).write_module(module)
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut asm = vec![];
        Writer::new(&mut asm)
            .write_function(self)
            .map_err(|_| std::fmt::Error)?;
        write!(f, "{}", String::from_utf8_lossy(&asm))
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", write_string(self))
    }
}

/// Emits a single function, picking unique names for its values and blocks.
struct FunctionWriter<'a, T> {
    writer: &'a mut Writer<T>,
    func: &'a Function,
    value_names: HashMap<Value, Rc<String>>,
    block_names: HashMap<Block, Rc<String>>,
    name_indices: HashMap<Rc<String>, usize>,
    names: HashSet<Rc<String>>,
    tmp_index: usize,
}

impl<'a, T: Write> FunctionWriter<'a, T> {
    fn new(writer: &'a mut Writer<T>, func: &'a Function) -> Self {
        Self {
            writer,
            func,
            value_names: Default::default(),
            block_names: Default::default(),
            name_indices: Default::default(),
            names: Default::default(),
            tmp_index: 0,
        }
    }

    fn write_value_name(&mut self, value: Value) -> Result<()> {
        if let Some(name) = self.value_names.get(&value) {
            return write!(self.writer.sink, "%{}", name);
        }
        let name = self.uniquify_name(self.func.get_name(value));
        write!(self.writer.sink, "%{}", name)?;
        self.value_names.insert(value, name);
        Ok(())
    }

    fn write_value_list(&mut self, values: &[Value]) -> Result<()> {
        let mut comma = false;
        for &value in values {
            if comma {
                write!(self.writer.sink, ", ")?;
            }
            comma = true;
            self.write_value_name(value)?;
        }
        Ok(())
    }

    fn write_block_name(&mut self, block: Block) -> Result<()> {
        if let Some(name) = self.block_names.get(&block) {
            return write!(self.writer.sink, "%{}", name);
        }
        let name = self.uniquify_name(self.func.block_name(block));
        write!(self.writer.sink, "%{}", name)?;
        self.block_names.insert(block, name);
        Ok(())
    }

    /// Uniquify a value or block name.
    fn uniquify_name(&mut self, name: Option<&str>) -> Rc<String> {
        if let Some(requested_name) = name {
            let requested_name = escape_name(requested_name);
            let idx = self.name_indices.entry(requested_name.clone()).or_insert(0);
            loop {
                let name = if *idx == 0 {
                    requested_name.clone()
                } else {
                    Rc::new(format!("{}{}", requested_name, idx))
                };
                *idx += 1;
                if self.names.insert(name.clone()) {
                    break name;
                }
            }
        } else {
            loop {
                let name = Rc::new(format!("{}", self.tmp_index));
                self.tmp_index += 1;
                if self.names.insert(name.clone()) {
                    break name;
                }
            }
        }
    }

    fn write_inst(&mut self, inst: Inst) -> Result<()> {
        let func = self.func;
        if let Some(result) = func.get_inst_result(inst) {
            self.write_value_name(result)?;
            write!(self.writer.sink, " = ")?;
        }
        let data = &func[inst];
        write!(self.writer.sink, "{}", data.opcode())?;
        if data.flags().contains(InstFlags::VOLATILE) {
            write!(self.writer.sink, " volatile")?;
        }
        if data.flags().contains(InstFlags::PURE) {
            write!(self.writer.sink, " pure")?;
        }
        if let Some(imm) = data.imm() {
            write!(self.writer.sink, " {}", imm)?;
        }
        if let Some(callee) = data.callee() {
            write!(self.writer.sink, " @{}(", callee)?;
            self.write_value_list(data.args())?;
            return write!(self.writer.sink, ")");
        }
        if !data.args().is_empty() {
            write!(self.writer.sink, " ")?;
            self.write_value_list(data.args())?;
        }
        let mut sep = if data.args().is_empty() { " " } else { ", " };
        for target in data.targets() {
            write!(self.writer.sink, "{}", sep)?;
            self.write_block_name(target.block)?;
            if !target.args.is_empty() {
                write!(self.writer.sink, "(")?;
                self.write_value_list(&target.args)?;
                write!(self.writer.sink, ")")?;
            }
            sep = ", ";
        }
        Ok(())
    }
}

/// Replace characters that cannot appear in a name.
fn escape_name(name: &str) -> Rc<String> {
    Rc::new(
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
    )
}
