use super::dfg::DataFlowGraph;
use crate::opcode::Opcode;
use crate::types::{DataId, FuncId, GlobalId, StackSlot, Value, ValueList};
use core::fmt;
use cranelift_entity::entity_impl;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(pub u32);
entity_impl!(Inst, "inst");

impl Inst {
    pub fn visit_operands<F>(self, dfg: &DataFlowGraph, f: F)
    where
        F: FnMut(Value),
    {
        dfg.instructions[self].visit_operands(dfg, f)
    }
}

#[derive(Debug, Clone)]
pub enum InstructionData {
    /// 一元运算（含所有类型转换）
    Unary { opcode: Opcode, arg: Value },
    /// 二元运算
    Binary { opcode: Opcode, args: [Value; 2] },
    /// 整数常量
    Iconst { value: i64 },
    /// 浮点常量（按位存储）
    Fconst { value: u64 },
    /// 从栈槽加载
    StackLoad { slot: StackSlot },
    /// 存储到栈槽
    StackStore { slot: StackSlot, value: Value },
    /// 读取模块全局变量
    GlobalLoad { global: GlobalId },
    /// 获取只读数据对象地址
    DataAddr { data: DataId },
    /// 直接函数调用
    Call { func_id: FuncId, args: ValueList },
    /// 函数返回
    Return { value: Option<Value> },
}

impl InstructionData {
    pub fn visit_operands<F>(&self, dfg: &DataFlowGraph, mut f: F)
    where
        F: FnMut(Value),
    {
        match self {
            InstructionData::Unary { arg, .. } => f(*arg),
            InstructionData::Binary { args, .. } => {
                f(args[0]);
                f(args[1]);
            }
            InstructionData::StackStore { value, .. } => f(*value),
            InstructionData::Call { args, .. } => {
                for &arg in dfg.get_value_list(*args) {
                    f(arg);
                }
            }
            InstructionData::Return { value } => {
                if let Some(v) = value {
                    f(*v);
                }
            }
            InstructionData::Iconst { .. }
            | InstructionData::Fconst { .. }
            | InstructionData::StackLoad { .. }
            | InstructionData::GlobalLoad { .. }
            | InstructionData::DataAddr { .. } => {}
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            InstructionData::Unary { opcode, .. } => *opcode,
            InstructionData::Binary { opcode, .. } => *opcode,
            InstructionData::Iconst { .. } => Opcode::Iconst,
            InstructionData::Fconst { .. } => Opcode::Fconst,
            InstructionData::StackLoad { .. } => Opcode::StackLoad,
            InstructionData::StackStore { .. } => Opcode::StackStore,
            InstructionData::GlobalLoad { .. } => Opcode::GlobalLoad,
            InstructionData::DataAddr { .. } => Opcode::DataAddr,
            InstructionData::Call { .. } => Opcode::Call,
            InstructionData::Return { .. } => Opcode::Return,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.opcode(), Opcode::Return)
    }
}

impl fmt::Display for InstructionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode())
    }
}
