use super::inst::{Inst, InstructionData};
use crate::constant::Constant;
use crate::types::{Block, Type, Value, ValueData, ValueDef, ValueList, ValueListPool};
use alloc::string::String;
use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{PrimaryMap, SecondaryMap};

#[derive(Debug, Clone)]
pub struct DataFlowGraph {
    pub instructions: PrimaryMap<Inst, InstructionData>,
    pub values: PrimaryMap<Value, ValueData>,
    pub value_names: SecondaryMap<Value, String>,
    inst_results: SecondaryMap<Inst, PackedOption<Value>>,
    pub(crate) value_list_pool: ValueListPool,
}

impl Default for DataFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self {
            instructions: PrimaryMap::new(),
            values: PrimaryMap::new(),
            value_names: SecondaryMap::new(),
            inst_results: SecondaryMap::new(),
            value_list_pool: ValueListPool::new(),
        }
    }

    /// 为指令添加结果值（每条指令至多一个结果）
    pub fn append_result(&mut self, inst: Inst, ty: Type) -> Value {
        let value = self.values.push(ValueData {
            ty,
            def: ValueDef::Inst(inst),
        });
        self.inst_results[inst] = value.into();
        value
    }

    /// 获取指令的结果值
    pub fn inst_results(&self, inst: Inst) -> Option<Value> {
        self.inst_results[inst].expand()
    }

    /// 从切片创建 ValueList
    pub fn make_value_list(&mut self, values: &[Value]) -> ValueList {
        ValueList::from_slice(values, &mut self.value_list_pool)
    }

    /// 获取 ValueList 的切片引用
    pub fn get_value_list(&self, list: ValueList) -> &[Value] {
        list.as_slice(&self.value_list_pool)
    }

    pub fn append_block_param(&mut self, block: Block, ty: Type) -> Value {
        self.values.push(ValueData {
            ty,
            def: ValueDef::Param(block),
        })
    }

    pub fn inst(&self, inst: Inst) -> &InstructionData {
        &self.instructions[inst]
    }

    pub fn value_type(&self, val: Value) -> Type {
        self.values[val].ty
    }

    pub fn value_def(&self, val: Value) -> ValueDef {
        self.values[val].def
    }

    pub fn value_inst(&self, val: Value) -> Option<Inst> {
        match self.value_def(val) {
            ValueDef::Inst(inst) => Some(inst),
            ValueDef::Param(_) => None,
        }
    }

    pub fn value_name(&self, val: Value) -> Option<&str> {
        let name = &self.value_names[val];
        if name.is_empty() { None } else { Some(name) }
    }

    /// Resolve `val` to a constant if it is produced by a constant instruction.
    pub fn as_const(&self, val: Value) -> Option<Constant> {
        let inst = self.value_inst(val)?;
        let ty = self.value_type(val);
        match &self.instructions[inst] {
            InstructionData::Iconst { value } => match ty {
                Type::I128 => Some(Constant::I128(*value as i128)),
                _ if ty.is_integer() => Constant::from_int(ty, *value as i128),
                _ => None,
            },
            InstructionData::Fconst { value } => match ty {
                Type::F32 => Some(Constant::F32(f32::from_bits(*value as u32))),
                Type::F64 => Some(Constant::F64(f64::from_bits(*value))),
                _ => None,
            },
            _ => None,
        }
    }
}
