use crate::inst::Inst;
use crate::{
    Block, Error, Function, InstructionData, ModuleData, Opcode, Result, StackSlot, Type, Value,
};
use alloc::string::String;
use core::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyBlock(Block),
    NoTerminator(Block),
    InstAfterTerminator(Block, Inst),
    TypeMismatch {
        opcode: Opcode,
        expected: Type,
        got: Type,
    },
    ReturnMismatch {
        expected: Type,
        got: Type,
    },
    OperandTypeMismatch {
        inst: Inst,
        lhs: Type,
        rhs: Type,
    },
    InvalidConversion {
        inst: Inst,
        opcode: Opcode,
        from: Type,
        to: Type,
    },
    PointerArithmetic(Inst, Opcode),
    ArgumentCount {
        inst: Inst,
        expected: usize,
        got: usize,
        variadic: bool,
    },
    ArgumentType {
        inst: Inst,
        index: usize,
        expected: Type,
        got: Type,
    },
    StackSlotMismatch {
        inst: Inst,
        slot: StackSlot,
        expected: Type,
        got: Type,
    },
    Other(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBlock(b) => write!(f, "Block {} is empty", b),
            Self::NoTerminator(b) => write!(f, "Block {} does not end with a terminator", b),
            Self::InstAfterTerminator(b, inst) => {
                write!(f, "Instruction {} follows the terminator of {}", inst, b)
            }
            Self::TypeMismatch {
                opcode,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Instruction {} type mismatch: expected {}, got {}",
                    opcode, expected, got
                )
            }
            Self::ReturnMismatch { expected, got } => {
                write!(f, "Return type mismatch: expected {}, got {}", expected, got)
            }
            Self::OperandTypeMismatch { inst, lhs, rhs } => {
                write!(
                    f,
                    "Operand type mismatch for {}: lhs {}, rhs {}",
                    inst, lhs, rhs
                )
            }
            Self::InvalidConversion {
                inst,
                opcode,
                from,
                to,
            } => {
                write!(
                    f,
                    "Invalid conversion in {} for {}: from {} to {}",
                    inst, opcode, from, to
                )
            }
            Self::PointerArithmetic(inst, opcode) => {
                write!(
                    f,
                    "Pointer arithmetic not allowed for instruction {} ({})",
                    inst, opcode
                )
            }
            Self::ArgumentCount {
                inst,
                expected,
                got,
                variadic,
            } => {
                let at_least = if *variadic { "at least " } else { "" };
                write!(
                    f,
                    "Call {} expects {}{} arguments, got {}",
                    inst, at_least, expected, got
                )
            }
            Self::ArgumentType {
                inst,
                index,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Call {} argument {} type mismatch: expected {}, got {}",
                    inst, index, expected, got
                )
            }
            Self::StackSlotMismatch {
                inst,
                slot,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Instruction {} accesses {} as {}, slot holds {}",
                    inst, slot, got, expected
                )
            }
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

impl ModuleData {
    pub fn validate(&self) -> Result<()> {
        for (_, func) in self.functions.iter() {
            func.validate(self).map_err(|e| match e {
                Error::Validation(source) => Error::InFunction {
                    name: func.name.clone(),
                    source,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

impl Function {
    /// Check a function body. Declarations without a body are always valid.
    pub fn validate(&self, module: &ModuleData) -> Result<()> {
        let dfg = &self.dfg;
        let layout = &self.layout;

        if !self.is_defined() {
            return Ok(());
        }

        for &block in &layout.block_order {
            let insts = &layout.blocks[block].insts;
            let Some(&last_inst) = insts.last() else {
                return Err(ValidationError::EmptyBlock(block).into());
            };
            for (i, &inst) in insts.iter().enumerate() {
                if dfg.instructions[inst].is_terminator() && inst != last_inst {
                    return Err(ValidationError::InstAfterTerminator(block, insts[i + 1]).into());
                }
                self.validate_inst(module, inst)?;
            }
            if !dfg.instructions[last_inst].is_terminator() {
                return Err(ValidationError::NoTerminator(block).into());
            }
        }
        Ok(())
    }

    fn validate_inst(&self, module: &ModuleData, inst: Inst) -> Result<()> {
        let dfg = &self.dfg;
        let data = &dfg.instructions[inst];
        let val_ty = |v: Value| dfg.values[v].ty;
        let result_ty = dfg.inst_results(inst).map(val_ty).unwrap_or(Type::Void);

        match data {
            InstructionData::Unary { opcode, arg } => {
                let from = val_ty(*arg);
                let to = result_ty;
                let is_valid = match opcode {
                    Opcode::ExtendS | Opcode::ExtendU => {
                        from.is_integer() && to.is_integer() && from.bits() < to.bits()
                    }
                    Opcode::Wrap => from.is_integer() && to.is_integer() && from.bits() > to.bits(),
                    Opcode::FloatPromote => from == Type::F32 && to == Type::F64,
                    Opcode::FloatDemote => from == Type::F64 && to == Type::F32,
                    Opcode::FloatToIntS => from.is_float() && to.is_integer(),
                    Opcode::IntToFloatS => from.is_integer() && to.is_float(),
                    Opcode::IntToPtr => from.is_integer() && to.is_pointer(),
                    Opcode::PtrToInt => from.is_pointer() && to.is_integer(),
                    _ => false,
                };
                if !is_valid {
                    return Err(ValidationError::InvalidConversion {
                        inst,
                        opcode: *opcode,
                        from,
                        to,
                    }
                    .into());
                }
            }
            InstructionData::Binary { opcode, args } => {
                let lhs_ty = val_ty(args[0]);
                let rhs_ty = val_ty(args[1]);

                if lhs_ty.is_pointer() || rhs_ty.is_pointer() {
                    return Err(ValidationError::PointerArithmetic(inst, *opcode).into());
                }
                if lhs_ty != rhs_ty || lhs_ty != result_ty {
                    return Err(ValidationError::OperandTypeMismatch {
                        inst,
                        lhs: lhs_ty,
                        rhs: rhs_ty,
                    }
                    .into());
                }
                let class_ok = if opcode.is_float_arith() {
                    lhs_ty.is_float()
                } else {
                    lhs_ty.is_integer()
                };
                if !class_ok {
                    return Err(ValidationError::TypeMismatch {
                        opcode: *opcode,
                        expected: if opcode.is_float_arith() {
                            Type::F64
                        } else {
                            Type::I64
                        },
                        got: lhs_ty,
                    }
                    .into());
                }
            }
            InstructionData::Iconst { .. } => {
                if !result_ty.is_integer() {
                    return Err(ValidationError::TypeMismatch {
                        opcode: Opcode::Iconst,
                        expected: Type::I64,
                        got: result_ty,
                    }
                    .into());
                }
            }
            InstructionData::Fconst { .. } => {
                if !result_ty.is_float() {
                    return Err(ValidationError::TypeMismatch {
                        opcode: Opcode::Fconst,
                        expected: Type::F64,
                        got: result_ty,
                    }
                    .into());
                }
            }
            InstructionData::StackLoad { slot } => {
                let expected = self.stack_slots[*slot].ty;
                if expected != result_ty {
                    return Err(ValidationError::StackSlotMismatch {
                        inst,
                        slot: *slot,
                        expected,
                        got: result_ty,
                    }
                    .into());
                }
            }
            InstructionData::StackStore { slot, value } => {
                let expected = self.stack_slots[*slot].ty;
                let got = val_ty(*value);
                if expected != got {
                    return Err(ValidationError::StackSlotMismatch {
                        inst,
                        slot: *slot,
                        expected,
                        got,
                    }
                    .into());
                }
            }
            InstructionData::GlobalLoad { .. }
            | InstructionData::DataAddr { .. } => {}
            InstructionData::Call { func_id, args } => {
                let sig = module.func_signature(*func_id);
                let args = dfg.get_value_list(*args);
                if !sig.accepts_arity(args.len()) {
                    return Err(ValidationError::ArgumentCount {
                        inst,
                        expected: sig.params.len(),
                        got: args.len(),
                        variadic: sig.variadic,
                    }
                    .into());
                }
                for (index, (&arg, &expected)) in args.iter().zip(sig.params.iter()).enumerate() {
                    let got = val_ty(arg);
                    if got != expected {
                        return Err(ValidationError::ArgumentType {
                            inst,
                            index,
                            expected,
                            got,
                        }
                        .into());
                    }
                }
            }
            InstructionData::Return { value } => {
                let expected = module.signatures[self.signature].ret;
                let got = value.map(val_ty).unwrap_or(Type::Void);
                if expected != got {
                    return Err(ValidationError::ReturnMismatch { expected, got }.into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallConv, Linkage, ModuleBuilder};
    use alloc::string::ToString;

    fn single_function(ret: Type) -> (ModuleBuilder, crate::FuncId) {
        let mut mb = ModuleBuilder::new();
        let sig = mb.make_signature(vec![], ret, false, CallConv::SystemV);
        let f = mb.declare_function("f".to_string(), sig, Linkage::Local);
        (mb, f)
    }

    fn validation_error(mb: &ModuleBuilder) -> ValidationError {
        match mb.validate() {
            Err(Error::InFunction { source, .. }) => source,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_function() {
        let (mut mb, f) = single_function(Type::I64);
        let mut builder = mb.builder(f);
        builder.init_entry_block();
        let a = builder.ins().i32const(1);
        let b = builder.ins().extend_s(a, Type::I64);
        builder.ins().ret(Some(b));
        assert!(mb.validate().is_ok());
    }

    #[test]
    fn test_missing_terminator() {
        let (mut mb, f) = single_function(Type::Void);
        let mut builder = mb.builder(f);
        let entry = builder.init_entry_block();
        builder.ins().i32const(1);
        assert_eq!(validation_error(&mb), ValidationError::NoTerminator(entry));
    }

    #[test]
    fn test_return_type_mismatch() {
        let (mut mb, f) = single_function(Type::I32);
        let mut builder = mb.builder(f);
        builder.init_entry_block();
        let v = builder.ins().f64const(1.0);
        builder.ins().ret(Some(v));
        assert_eq!(
            validation_error(&mb),
            ValidationError::ReturnMismatch {
                expected: Type::I32,
                got: Type::F64
            }
        );
    }

    #[test]
    fn test_operand_type_mismatch() {
        let (mut mb, f) = single_function(Type::Void);
        let mut builder = mb.builder(f);
        builder.init_entry_block();
        let a = builder.ins().i32const(1);
        let b = builder.ins().i64const(2);
        builder.ins().iadd(a, b);
        builder.ins().ret(None);
        assert!(matches!(
            validation_error(&mb),
            ValidationError::OperandTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_invalid_widening() {
        let (mut mb, f) = single_function(Type::Void);
        let mut builder = mb.builder(f);
        builder.init_entry_block();
        let a = builder.ins().i64const(1);
        builder.ins().extend_s(a, Type::I32);
        builder.ins().ret(None);
        assert!(matches!(
            validation_error(&mb),
            ValidationError::InvalidConversion {
                opcode: Opcode::ExtendS,
                ..
            }
        ));
    }

    #[test]
    fn test_variadic_call_arity() {
        let mut mb = ModuleBuilder::new();
        let callee_sig = mb.make_signature(vec![Type::Ptr], Type::I32, true, CallConv::SystemV);
        let callee = mb.declare_function("printf".to_string(), callee_sig, Linkage::Import);
        let sig = mb.make_signature(vec![], Type::Void, false, CallConv::SystemV);
        let f = mb.declare_function("f".to_string(), sig, Linkage::Local);

        let data = mb.intern_string(b"%d");
        let mut builder = mb.builder(f);
        builder.init_entry_block();
        let fmt = builder.ins().data_addr(data);
        let x = builder.ins().i32const(4);
        builder.ins().call(callee, &[fmt, x]);
        builder.ins().call(callee, &[]);
        builder.ins().ret(None);

        assert!(matches!(
            validation_error(&mb),
            ValidationError::ArgumentCount {
                expected: 1,
                got: 0,
                variadic: true,
                ..
            }
        ));
    }

    #[test]
    fn test_stack_slot_type_checked() {
        let (mut mb, f) = single_function(Type::Void);
        let mut builder = mb.builder(f);
        builder.init_entry_block();
        let slot = builder.create_stack_slot(Type::I64, "a");
        let v = builder.ins().i32const(3);
        builder.ins().stack_store(v, slot);
        builder.ins().ret(None);
        assert!(matches!(
            validation_error(&mb),
            ValidationError::StackSlotMismatch {
                expected: Type::I64,
                got: Type::I32,
                ..
            }
        ));
    }
}
