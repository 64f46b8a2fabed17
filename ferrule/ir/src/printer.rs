use crate::inst::InstructionData;
use crate::{DataFlowGraph, Value};

use super::function::Function;
use super::module::{Module, ModuleData};
use core::fmt::{Display, Formatter, Result, Write};

struct V<'a>(&'a DataFlowGraph, Value);

impl<'a> Display for V<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.0.value_name(self.1) {
            Some(name) => write!(f, "{}(v{})", name, self.1.0),
            None => write!(f, "v{}", self.1.0),
        }
    }
}

/// Escaped byte string, as it appears in a data declaration.
struct Bytes<'a>(&'a [u8]);

impl<'a> Display for Bytes<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_char('"')?;
        for &b in self.0 {
            match b {
                b'"' => f.write_str("\\\"")?,
                b'\\' => f.write_str("\\\\")?,
                b'\n' => f.write_str("\\n")?,
                b'\t' => f.write_str("\\t")?,
                b'\r' => f.write_str("\\r")?,
                0 => f.write_str("\\0")?,
                0x20..=0x7e => f.write_char(b as char)?,
                _ => write!(f, "\\x{:02x}", b)?,
            }
        }
        f.write_char('"')
    }
}

pub(crate) fn write_module(f: &mut dyn Write, module: &ModuleData) -> Result {
    if !module.name.is_empty() {
        writeln!(f, "; module {}", module.name)?;
        writeln!(f)?;
    }
    for (_, global) in module.globals.iter() {
        write!(f, "global {}: {}", global.name, global.ty)?;
        if let Some(init) = global.init {
            write!(f, " = {}", init)?;
        }
        writeln!(f, " ({})", global.linkage)?;
    }

    for (_, data) in module.data.iter() {
        writeln!(f, "data {} = {}", data.name, Bytes(&data.bytes))?;
    }

    for (i, (_func_id, func)) in module.functions.iter().enumerate() {
        if i > 0 || !module.globals.is_empty() || !module.data.is_empty() {
            writeln!(f)?;
        }
        write_function_template(f, func, Some(module))?;
    }
    Ok(())
}

pub(crate) fn write_function(f: &mut dyn Write, func: &Function) -> Result {
    write_function_template(f, func, None)
}

fn write_function_template(
    f: &mut dyn Write,
    func: &Function,
    module: Option<&ModuleData>,
) -> Result {
    write!(f, "{} function {}", func.linkage, func.name)?;
    match module {
        Some(m) => write!(f, "{}", m.signatures[func.signature])?,
        None => write!(f, "({})", func.signature)?,
    }

    if !func.is_defined() {
        return writeln!(f);
    }
    writeln!(f, " {{")?;

    for (ss, data) in func.stack_slots.iter() {
        write!(f, "  {}: {}", ss, data.ty)?;
        if !data.name.is_empty() {
            write!(f, " ; {}", data.name)?;
        }
        writeln!(f)?;
    }

    let dfg = &func.dfg;
    let v = |val| V(dfg, val);

    for &block in &func.layout.block_order {
        let block_data = &func.layout.blocks[block];
        write!(f, "{}(", block)?;
        for (i, &param) in block_data.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", v(param), dfg.values[param].ty)?;
        }
        writeln!(f, "):")?;

        for &inst in &block_data.insts {
            let idata = &dfg.instructions[inst];
            let res = dfg.inst_results(inst);

            write!(f, "  ")?;
            if let Some(r) = res {
                write!(f, "{} = ", v(r))?;
            }

            match idata {
                InstructionData::Unary { opcode, arg } => {
                    let ty = res.map(|r| dfg.value_type(r)).unwrap_or(crate::Type::Void);
                    write!(f, "{}.{} {}", opcode, ty, v(*arg))?;
                }
                InstructionData::Binary { opcode, args } => {
                    write!(f, "{} {}, {}", opcode, v(args[0]), v(args[1]))?;
                }
                InstructionData::Iconst { value } => {
                    let ty = res.map(|r| dfg.value_type(r)).unwrap_or(crate::Type::Void);
                    write!(f, "iconst.{} {}", ty, value)?;
                }
                InstructionData::Fconst { value } => match res.map(|r| dfg.value_type(r)) {
                    Some(crate::Type::F32) => {
                        write!(f, "fconst.f32 {:?}", f32::from_bits(*value as u32))?
                    }
                    _ => write!(f, "fconst.f64 {:?}", f64::from_bits(*value))?,
                },
                InstructionData::StackLoad { slot } => {
                    write!(f, "stack_load.{} {}", func.stack_slots[*slot].ty, slot)?;
                }
                InstructionData::StackStore { slot, value } => {
                    write!(f, "stack_store {}, {}", v(*value), slot)?;
                }
                InstructionData::GlobalLoad { global } => match module {
                    Some(m) => write!(f, "global_load {}", m.globals[*global].name)?,
                    None => write!(f, "global_load {}", global)?,
                },
                InstructionData::DataAddr { data } => match module {
                    Some(m) => write!(f, "data_addr {}", m.data[*data].name)?,
                    None => write!(f, "data_addr {}", data)?,
                },
                InstructionData::Call { func_id, args } => {
                    match module {
                        Some(m) => write!(f, "call {}(", m.functions[*func_id].name)?,
                        None => write!(f, "call {}(", func_id)?,
                    }
                    for (i, &arg) in dfg.get_value_list(*args).iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", v(arg))?;
                    }
                    write!(f, ")")?;
                }
                InstructionData::Return { value } => match value {
                    Some(val) => write!(f, "ret {}", v(*val))?,
                    None => write!(f, "ret")?,
                },
            }
            writeln!(f)?;
        }
    }
    writeln!(f, "}}")
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_module(f, &self.inner)
    }
}

impl Display for ModuleData {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_module(f, self)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_function(f, self)
    }
}
