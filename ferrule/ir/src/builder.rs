use super::function::{Function, StackSlotData};
use super::inst::{Inst, InstructionData};
use super::opcode::Opcode;
use super::types::{Block, DataId, FuncId, GlobalId, Signature, StackSlot, Type, Value, ValueList};
use crate::constant::Constant;
use crate::{CallConv, Error, Linkage, Module, ModuleData, Result, SigId};
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use smallvec::{SmallVec, smallvec};

pub struct ModuleBuilder {
    data: ModuleData,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            data: ModuleData::default(),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut builder = Self::new();
        builder.data.name = name.into();
        builder
    }

    pub fn declare_function(&mut self, name: String, sig_id: SigId, linkage: Linkage) -> FuncId {
        self.data.declare_function(name, sig_id, linkage)
    }

    pub fn make_signature(
        &mut self,
        params: Vec<Type>,
        ret: Type,
        variadic: bool,
        call_conv: CallConv,
    ) -> SigId {
        let sig = Signature::new(params, ret, variadic, call_conv);
        self.data.intern_signature(sig)
    }

    pub fn get_func_id(&self, name: &str) -> Option<FuncId> {
        self.data.get_func_id(name)
    }

    pub fn get_global_id(&self, name: &str) -> Option<GlobalId> {
        self.data.get_global_id(name)
    }

    pub fn function(&self, func_id: FuncId) -> &Function {
        &self.data.functions[func_id]
    }

    pub fn func_signature(&self, func_id: FuncId) -> &Signature {
        self.data.func_signature(func_id)
    }

    pub fn builder(&mut self, func_id: FuncId) -> FunctionBuilder<'_> {
        FunctionBuilder::new(&mut self.data, func_id)
    }

    pub fn add_global(
        &mut self,
        name: String,
        ty: Type,
        linkage: Linkage,
        init: Option<Constant>,
    ) -> Result<GlobalId> {
        if self.data.get_global_id(&name).is_some() {
            return Err(Error::Message(format!("global {} is already defined", name)));
        }
        if let Some(c) = init {
            if c.ty() != ty {
                return Err(Error::Message(format!(
                    "initializer of global {} has type {}, expected {}",
                    name,
                    c.ty(),
                    ty
                )));
            }
        }
        Ok(self.data.add_global(name, ty, linkage, init))
    }

    pub fn intern_string(&mut self, contents: &[u8]) -> DataId {
        self.data.intern_data(contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.data.validate()
    }

    pub fn build(self) -> Module {
        Module {
            inner: Arc::new(self.data),
        }
    }
}

pub struct FunctionBuilder<'a> {
    module: &'a mut ModuleData,
    func_id: FuncId,
    current_block: Option<Block>,
}

impl<'a> FunctionBuilder<'a> {
    pub(crate) fn new(module: &'a mut ModuleData, func_id: FuncId) -> Self {
        let current_block = module.functions[func_id].entry_block;
        Self {
            module,
            func_id,
            current_block,
        }
    }

    /// Create the entry block and give it one parameter per fixed signature parameter.
    pub fn init_entry_block(&mut self) -> Block {
        let entry = self.create_block();
        self.switch_to_block(entry);

        let sig_id = self.func().signature;
        let params = self.module.signatures[sig_id].params.clone();
        for ty in params.iter().copied() {
            self.add_block_param(entry, ty);
        }
        entry
    }

    pub fn current_block(&self) -> Option<Block> {
        self.current_block
    }

    pub fn func(&self) -> &Function {
        &self.module.functions[self.func_id]
    }

    pub fn func_mut(&mut self) -> &mut Function {
        &mut self.module.functions[self.func_id]
    }

    pub fn func_signature(&self, func_id: FuncId) -> SigId {
        self.module.functions[func_id].signature
    }

    pub fn signature(&self, sig_id: SigId) -> &Signature {
        &self.module.signatures[sig_id]
    }

    /// Compute the result type of an instruction whose type follows from its operands.
    /// Conversions, loads and constants carry their type explicitly via `push_inst_with_type`.
    fn inst_result_types(&self, data: &InstructionData) -> SmallVec<[Type; 1]> {
        match data {
            InstructionData::Binary { args, .. } => smallvec![self.value_type(args[0])],
            InstructionData::Unary { arg, .. } => smallvec![self.value_type(*arg)],
            InstructionData::DataAddr { .. } => smallvec![Type::Ptr],
            InstructionData::StackLoad { slot } => {
                smallvec![self.func().stack_slots[*slot].ty]
            }
            InstructionData::GlobalLoad { global } => smallvec![self.module.globals[*global].ty],
            // Call instructions: return type is obtained from the signature
            InstructionData::Call { func_id, .. } => {
                let ret = self.module.func_signature(*func_id).ret;
                if ret == Type::Void {
                    smallvec![]
                } else {
                    smallvec![ret]
                }
            }
            InstructionData::Iconst { .. } | InstructionData::Fconst { .. } => smallvec![],
            InstructionData::StackStore { .. } | InstructionData::Return { .. } => smallvec![],
        }
    }

    fn push_inst(&mut self, block: Block, data: InstructionData) -> Inst {
        let types = self.inst_result_types(&data);
        let inst = self.func_mut().dfg.instructions.push(data);
        self.func_mut().layout.append_inst(block, inst);
        if let Some(&ty) = types.first() {
            self.func_mut().dfg.append_result(inst, ty);
        }
        inst
    }

    /// Push an instruction that requires explicit result type (like Iconst or a conversion)
    fn push_inst_with_type(&mut self, block: Block, data: InstructionData, ty: Type) -> Value {
        let inst = self.func_mut().dfg.instructions.push(data);
        self.func_mut().layout.append_inst(block, inst);
        self.func_mut().dfg.append_result(inst, ty)
    }

    /// Intern a NUL-terminated byte string in the enclosing module.
    pub fn intern_string(&mut self, contents: &[u8]) -> DataId {
        self.module.intern_data(contents)
    }

    pub fn make_value_list(&mut self, values: &[Value]) -> ValueList {
        self.func_mut().dfg.make_value_list(values)
    }

    pub fn create_block(&mut self) -> Block {
        self.func_mut().layout.create_block()
    }

    pub fn create_stack_slot(&mut self, ty: Type, name: &str) -> StackSlot {
        self.func_mut().stack_slots.push(StackSlotData {
            ty,
            name: name.to_string(),
        })
    }

    pub fn stack_slot_type(&self, slot: StackSlot) -> Type {
        self.func().stack_slots[slot].ty
    }

    pub fn switch_to_block(&mut self, block: Block) {
        if !self.func().layout.block_order.contains(&block) {
            self.func_mut().layout.append_block(block);
        }
        self.current_block = Some(block);
        if !self.func().is_defined() {
            self.func_mut().entry_block = Some(block);
        }
    }

    pub fn block_params(&self, block: Block) -> &[Value] {
        &self.func().layout.blocks[block].params
    }

    pub fn entry_block(&self) -> Option<Block> {
        self.func().entry_block
    }

    pub fn value_type(&self, val: Value) -> Type {
        self.func().dfg.value_type(val)
    }

    pub fn set_value_name(&mut self, val: Value, name: &str) {
        self.func_mut().dfg.value_names[val] = name.to_string();
    }

    pub fn add_block_param(&mut self, block: Block, ty: Type) -> Value {
        let val = self.func_mut().dfg.append_block_param(block, ty);
        self.func_mut().layout.blocks[block].params.push(val);
        val
    }

    pub fn func_params(&self) -> &[Value] {
        if let Some(entry) = self.func().entry_block {
            self.block_params(entry)
        } else {
            &[]
        }
    }

    pub fn func_param(&self, index: usize) -> Value {
        self.func_params()[index]
    }

    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.func().dfg.inst_results(inst)
    }

    pub fn ins(&mut self) -> InstBuilder<'_, 'a> {
        InstBuilder { builder: self }
    }

    pub fn is_current_block_terminated(&self) -> bool {
        let Some(block) = self.current_block else {
            return false;
        };
        match self.func().layout.last_inst(block) {
            Some(last_inst) => self.func().dfg.inst(last_inst).is_terminator(),
            None => false,
        }
    }
}

pub struct InstBuilder<'b, 'a> {
    builder: &'b mut FunctionBuilder<'a>,
}

impl<'b, 'a> InstBuilder<'b, 'a> {
    /// The block instructions are appended to. Positions the builder at the
    /// entry block when none has been selected yet.
    pub fn block(&mut self) -> Block {
        match self.builder.current_block {
            Some(block) => block,
            None => self.builder.init_entry_block(),
        }
    }

    pub fn value_type(&self, val: Value) -> Type {
        self.builder.value_type(val)
    }

    fn push(&mut self, data: InstructionData) -> Inst {
        let block = self.block();
        self.builder.push_inst(block, data)
    }

    fn push_value(&mut self, data: InstructionData) -> Value {
        let inst = self.push(data);
        match self.builder.inst_result(inst) {
            Some(value) => value,
            None => unreachable!("{} produces no value", inst),
        }
    }

    fn push_with_type(&mut self, data: InstructionData, ty: Type) -> Value {
        let block = self.block();
        self.builder.push_inst_with_type(block, data, ty)
    }

    /// Helper for binary operations
    fn push_binary(&mut self, opcode: Opcode, lhs: Value, rhs: Value) -> Value {
        self.push_value(InstructionData::Binary {
            opcode,
            args: [lhs, rhs],
        })
    }

    /// Helper for conversions, which always name their result type
    fn push_convert(&mut self, opcode: Opcode, arg: Value, ty: Type) -> Value {
        self.push_with_type(InstructionData::Unary { opcode, arg }, ty)
    }

    /// Integer constant; the value is truncated to the width of `ty`.
    pub fn iconst(&mut self, ty: Type, val: i64) -> Value {
        debug_assert!(ty.is_integer(), "iconst only supports integer types");
        let value = match ty {
            Type::I8 => val as i8 as i64,
            Type::I16 => val as i16 as i64,
            Type::I32 => val as i32 as i64,
            _ => val,
        };
        self.push_with_type(InstructionData::Iconst { value }, ty)
    }

    pub fn i32const(&mut self, val: i32) -> Value {
        self.iconst(Type::I32, val as i64)
    }

    pub fn i64const(&mut self, val: i64) -> Value {
        self.iconst(Type::I64, val)
    }

    pub fn fconst(&mut self, ty: Type, bits: u64) -> Value {
        debug_assert!(ty.is_float(), "fconst only supports float types");
        self.push_with_type(InstructionData::Fconst { value: bits }, ty)
    }

    pub fn f32const(&mut self, val: f32) -> Value {
        self.fconst(Type::F32, val.to_bits() as u64)
    }

    pub fn f64const(&mut self, val: f64) -> Value {
        self.fconst(Type::F64, val.to_bits())
    }

    pub fn iadd(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::IAdd, lhs, rhs)
    }

    pub fn isub(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::ISub, lhs, rhs)
    }

    pub fn imul(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::IMul, lhs, rhs)
    }

    /// Signed division, truncating toward zero
    pub fn idiv_s(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::IDivS, lhs, rhs)
    }

    pub fn irem_s(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::IRemS, lhs, rhs)
    }

    pub fn fadd(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::FAdd, lhs, rhs)
    }

    pub fn fsub(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::FSub, lhs, rhs)
    }

    pub fn fmul(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::FMul, lhs, rhs)
    }

    pub fn fdiv(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_binary(Opcode::FDiv, lhs, rhs)
    }

    pub fn extend_s(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::ExtendS, val, ty)
    }

    pub fn extend_u(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::ExtendU, val, ty)
    }

    pub fn wrap(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::Wrap, val, ty)
    }

    /// Float to signed int (truncate)
    pub fn float_to_int_s(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::FloatToIntS, val, ty)
    }

    /// Signed int to float
    pub fn int_to_float_s(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::IntToFloatS, val, ty)
    }

    /// F32 to F64 promotion
    pub fn float_promote(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::FloatPromote, val, ty)
    }

    /// F64 to F32 demotion
    pub fn float_demote(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::FloatDemote, val, ty)
    }

    pub fn int_to_ptr(&mut self, val: Value) -> Value {
        self.push_convert(Opcode::IntToPtr, val, Type::Ptr)
    }

    pub fn ptr_to_int(&mut self, val: Value, ty: Type) -> Value {
        self.push_convert(Opcode::PtrToInt, val, ty)
    }

    pub fn stack_load(&mut self, slot: StackSlot) -> Value {
        self.push_value(InstructionData::StackLoad { slot })
    }

    pub fn stack_store(&mut self, value: Value, slot: StackSlot) {
        self.push(InstructionData::StackStore { slot, value });
    }

    pub fn global_load(&mut self, global: GlobalId) -> Value {
        self.push_value(InstructionData::GlobalLoad { global })
    }

    pub fn data_addr(&mut self, data: DataId) -> Value {
        self.push_value(InstructionData::DataAddr { data })
    }

    pub fn call(&mut self, func_id: FuncId, args: &[Value]) -> Inst {
        let args = self.builder.make_value_list(args);
        self.push(InstructionData::Call { func_id, args })
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.push(InstructionData::Return { value });
    }
}
