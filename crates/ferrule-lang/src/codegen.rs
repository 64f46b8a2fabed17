//! Lowering from the AST into `ferrule_ir`.
//!
//! Globals are lowered first, then functions in source order. Every function
//! body gets its own symbol scope; identifiers that miss the scope fall back
//! to module globals. The first failure aborts lowering and no module is
//! produced.

use crate::ast::*;
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::{Error, LowerError, Result};
use crate::types::PrimitiveType;
use ferrule_ir::{
    CallConv, Constant, FuncId, FunctionBuilder, GlobalId, Linkage, Module, ModuleBuilder,
    StackSlot, Type, Value,
};
use hashbrown::{HashMap, HashSet};

/// Name of the one callee whose float arguments are promoted to `f64`.
const PRINTF: &str = "printf";

// ======================================
// Type table
// ======================================

/// Mapping from source types to IR types, built once per generator.
#[derive(Debug, Clone)]
pub struct TypeTable {
    map: HashMap<PrimitiveType, Type>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let map = PrimitiveType::ALL
            .iter()
            .filter_map(|&ty| ir_type_of(ty).map(|ir| (ty, ir)))
            .collect();
        TypeTable { map }
    }

    pub fn get(&self, ty: PrimitiveType) -> Option<Type> {
        self.map.get(&ty).copied()
    }

    /// Like [`TypeTable::get`], but an unmapped type is an error.
    pub fn lower(&self, ty: PrimitiveType) -> core::result::Result<Type, LowerError> {
        self.get(ty).ok_or(LowerError::UnmappedType(ty))
    }
}

fn ir_type_of(ty: PrimitiveType) -> Option<Type> {
    use PrimitiveType::*;
    Some(match ty {
        Void => Type::Void,
        I8 | U8 => Type::I8,
        I16 | U16 => Type::I16,
        I32 | U32 => Type::I32,
        I64 | U64 => Type::I64,
        I128 | U128 => Type::I128,
        F32 => Type::F32,
        F64 => Type::F64,
        I8Ptr | I16Ptr | I32Ptr | I64Ptr | U8Ptr | U16Ptr | U32Ptr | U64Ptr | F32Ptr | F64Ptr
        | Str => Type::Ptr,
        Invalid => return None,
    })
}

/// Rank used to pick the coercion direction of a binary operation.
///
/// Integers rank by width, floats above every integer, pointers just above
/// `void`.
pub fn priority(ty: PrimitiveType) -> i32 {
    match ty {
        PrimitiveType::F32 => 132,
        PrimitiveType::F64 => 164,
        PrimitiveType::Void => 0,
        ty if ty.is_pointer() => 2,
        ty => ty.bit_width().map_or(-1, |bits| bits as i32),
    }
}

// ======================================
// Symbols
// ======================================

#[derive(Debug, Clone)]
struct FunctionInfo {
    id: FuncId,
    params: Vec<PrimitiveType>,
    variadic: bool,
    ret: PrimitiveType,
    external: bool,
    defined: bool,
    line: u64,
}

#[derive(Debug, Clone, Copy)]
struct GlobalInfo {
    id: GlobalId,
    ty: PrimitiveType,
}

/// Module-level names visible from every function body.
#[derive(Debug, Default)]
struct Declarations {
    functions: HashMap<String, FunctionInfo>,
    globals: HashMap<String, GlobalInfo>,
}

#[derive(Debug, Clone, Copy)]
struct SymbolBinding {
    slot: StackSlot,
    ty: PrimitiveType,
}

/// An IR value together with the source type it was produced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typed {
    pub value: Value,
    pub ty: PrimitiveType,
}

// ======================================
// Generator
// ======================================

pub struct Generator<'s> {
    module: ModuleBuilder,
    types: TypeTable,
    decls: Declarations,
    sink: &'s mut dyn DiagnosticSink,
    validate: bool,
}

impl<'s> Generator<'s> {
    pub fn new(module_name: &str, sink: &'s mut dyn DiagnosticSink) -> Self {
        Generator {
            module: ModuleBuilder::with_name(module_name),
            types: TypeTable::new(),
            decls: Declarations::default(),
            sink,
            validate: true,
        }
    }

    /// Run the IR validator on the finished module (on by default).
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Lower a whole program. The first error is reported to the sink and
    /// returned.
    pub fn lower(mut self, program: &Program) -> Result<Module> {
        if let Err(err) = self.lower_program(program) {
            self.sink.report(Severity::Error, &err.message(), err.line());
            return Err(err);
        }
        Ok(self.module.build())
    }

    fn lower_program(&mut self, program: &Program) -> Result<()> {
        for global in &program.globals {
            self.lower_global(global)?;
        }
        for function in &program.functions {
            self.lower_function(function)?;
        }
        self.warn_undefined(program);

        if self.validate {
            self.module.validate().map_err(|e| self.validation_error(e))?;
        }
        log::debug!(
            "lowered {} globals and {} functions",
            self.decls.globals.len(),
            self.decls.functions.len()
        );
        Ok(())
    }

    /// Validator failures inside a function point at its declaration line;
    /// module-level failures have no line.
    fn validation_error(&self, err: ferrule_ir::Error) -> Error {
        let line = match &err {
            ferrule_ir::Error::InFunction { name, .. } => {
                self.decls.functions.get(name).map_or(0, |f| f.line)
            }
            _ => 0,
        };
        Error::lower(LowerError::InvalidIr(err.to_string()), line)
    }

    fn lower_global(&mut self, decl: &GlobalDecl) -> Result<()> {
        let fail = |kind| Err(Error::lower(kind, decl.line));
        if self.decls.globals.contains_key(&decl.name) {
            return fail(LowerError::Redeclaration(decl.name.clone()));
        }
        if decl.ty == PrimitiveType::Void {
            return fail(LowerError::VoidValue(format!("global '{}'", decl.name)));
        }
        let ir_ty = self
            .types
            .lower(decl.ty)
            .map_err(|kind| Error::lower(kind, decl.line))?;

        let Expr::Literal(literal) = &decl.initializer else {
            return fail(LowerError::UnsupportedGlobalInitializer(decl.name.clone()));
        };
        if !literal.ty.is_integer() {
            return fail(LowerError::UnsupportedGlobalInitializer(decl.name.clone()));
        }
        let Ok(value) = literal.text.parse::<i128>() else {
            return fail(LowerError::InvalidLiteral {
                ty: literal.ty,
                text: literal.text.clone(),
            });
        };
        let Some(init) = Constant::from_int(ir_ty, value) else {
            return fail(LowerError::UnsupportedGlobalInitializer(decl.name.clone()));
        };

        let id = self
            .module
            .add_global(decl.name.clone(), ir_ty, Linkage::Export, Some(init))
            .map_err(|e| Error::lower(LowerError::InvalidIr(e.to_string()), decl.line))?;
        self.decls
            .globals
            .insert(decl.name.clone(), GlobalInfo { id, ty: decl.ty });
        log::trace!("global {}: {} = {}", decl.name, decl.ty, init);
        Ok(())
    }

    fn lower_function(&mut self, decl: &FunctionDecl) -> Result<()> {
        let id = self.declare_function(decl)?;
        let Some(body) = &decl.body else {
            return Ok(());
        };

        if let Some(info) = self.decls.functions.get_mut(&decl.name) {
            info.defined = true;
        }
        log::debug!("lowering function {}", decl.name);

        let builder = self.module.builder(id);
        let mut lowering = FunctionLowering::new(builder, &self.types, &self.decls, decl);
        lowering.bind_params(decl)?;
        lowering.lower_body(body, decl.line)
    }

    /// Declare `decl`, or reuse the declaration of an earlier prototype.
    fn declare_function(&mut self, decl: &FunctionDecl) -> Result<FuncId> {
        let fail = |kind| Err(Error::lower(kind, decl.line));
        let mut params = Vec::new();
        let mut ir_params = Vec::new();
        for param in decl.fixed_params() {
            if param.ty == PrimitiveType::Void {
                return fail(LowerError::VoidValue(format!("parameter '{}'", param.name)));
            }
            let ir_ty = self
                .types
                .lower(param.ty)
                .map_err(|kind| Error::lower(kind, decl.line))?;
            params.push(param.ty);
            ir_params.push(ir_ty);
        }
        let ret = self
            .types
            .lower(decl.return_type)
            .map_err(|kind| Error::lower(kind, decl.line))?;
        let variadic = decl.is_variadic();

        if let Some(existing) = self.decls.functions.get(&decl.name) {
            if existing.params != params
                || existing.ret != decl.return_type
                || existing.variadic != variadic
            {
                return fail(LowerError::ConflictingDeclaration(decl.name.clone()));
            }
            if existing.defined && decl.body.is_some() {
                return fail(LowerError::Redefinition(decl.name.clone()));
            }
            let id = existing.id;
            if decl.body.is_some() && self.module.function(id).linkage == Linkage::Import {
                self.module.builder(id).func_mut().linkage = Linkage::Export;
            }
            return Ok(id);
        }

        let linkage = match (decl.has_external_linkage(), decl.body.is_some()) {
            (true, true) => Linkage::Export,
            (true, false) => Linkage::Import,
            (false, _) => Linkage::Local,
        };
        let sig = self
            .module
            .make_signature(ir_params, ret, variadic, CallConv::SystemV);
        let id = self.module.declare_function(decl.name.clone(), sig, linkage);
        self.decls.functions.insert(
            decl.name.clone(),
            FunctionInfo {
                id,
                params,
                variadic,
                ret: decl.return_type,
                external: decl.has_external_linkage(),
                defined: false,
                line: decl.line,
            },
        );
        Ok(id)
    }

    /// Internal prototypes that never received a body.
    fn warn_undefined(&mut self, program: &Program) {
        let mut warned = HashSet::new();
        for decl in &program.functions {
            let Some(info) = self.decls.functions.get(&decl.name) else {
                continue;
            };
            if info.defined || info.external || !warned.insert(decl.name.as_str()) {
                continue;
            }
            self.sink.report(
                Severity::Warning,
                &format!("function '{}' is declared but never defined", decl.name),
                info.line,
            );
        }
    }
}

// ======================================
// Function bodies
// ======================================

/// Lowers one function body. Owns the function's symbol scope, which is
/// dropped with it.
struct FunctionLowering<'a> {
    builder: FunctionBuilder<'a>,
    types: &'a TypeTable,
    decls: &'a Declarations,
    scope: HashMap<String, SymbolBinding>,
    name: &'a str,
    return_type: PrimitiveType,
    line: u64,
}

impl<'a> FunctionLowering<'a> {
    fn new(
        mut builder: FunctionBuilder<'a>,
        types: &'a TypeTable,
        decls: &'a Declarations,
        decl: &'a FunctionDecl,
    ) -> Self {
        builder.init_entry_block();
        FunctionLowering {
            builder,
            types,
            decls,
            scope: HashMap::new(),
            name: &decl.name,
            return_type: decl.return_type,
            line: decl.line,
        }
    }

    fn error(&self, kind: LowerError) -> Error {
        Error::lower(kind, self.line)
    }

    fn ir_type(&self, ty: PrimitiveType) -> Result<Type> {
        self.types.lower(ty).map_err(|kind| self.error(kind))
    }

    /// Spill each named parameter into a stack slot and bind it.
    fn bind_params(&mut self, decl: &FunctionDecl) -> Result<()> {
        for (index, param) in decl.fixed_params().enumerate() {
            if self.scope.contains_key(&param.name) {
                return Err(self.error(LowerError::Redeclaration(param.name.clone())));
            }
            let ir_ty = self.ir_type(param.ty)?;
            let value = self.builder.func_param(index);
            self.builder.set_value_name(value, &param.name);
            let slot = self.builder.create_stack_slot(ir_ty, &param.name);
            self.builder.ins().stack_store(value, slot);
            self.scope.insert(
                param.name.clone(),
                SymbolBinding {
                    slot,
                    ty: param.ty,
                },
            );
        }
        Ok(())
    }

    fn lower_body(&mut self, body: &CompoundStmt, decl_line: u64) -> Result<()> {
        for stmt in &body.stmts {
            if self.builder.is_current_block_terminated() {
                self.line = stmt_line(stmt).unwrap_or(self.line);
                return Err(self.error(LowerError::UnreachableCode));
            }
            self.lower_stmt(stmt)?;
        }

        if !self.builder.is_current_block_terminated() {
            if self.return_type != PrimitiveType::Void {
                self.line = decl_line;
                return Err(self.error(LowerError::MissingReturn(self.name.to_string())));
            }
            self.builder.ins().ret(None);
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        if let Some(line) = stmt_line(stmt) {
            self.line = line;
        }
        match stmt {
            Stmt::LocalDecl(decl) => self.lower_local(decl),
            Stmt::Return(ret) => {
                let value = self.lower_expr(&ret.value)?;
                self.line = ret.line;
                let value = self.coerce(value, self.return_type)?;
                self.builder.ins().ret(Some(value.value));
                Ok(())
            }
            Stmt::Call(call) => self.lower_call(call).map(|_| ()),
            Stmt::Compound(_) => Err(self.error(LowerError::NestedBlock)),
        }
    }

    fn lower_local(&mut self, decl: &LocalDecl) -> Result<()> {
        if self.scope.contains_key(&decl.name) {
            return Err(self.error(LowerError::Redeclaration(decl.name.clone())));
        }
        if decl.ty == PrimitiveType::Void {
            return Err(self.error(LowerError::VoidValue(format!("local '{}'", decl.name))));
        }
        let ir_ty = self.ir_type(decl.ty)?;

        let init = self.lower_expr(&decl.initializer)?;
        self.line = decl.line;
        let slot = self.builder.create_stack_slot(ir_ty, &decl.name);
        let value = self.coerce(init, decl.ty)?;
        self.builder.ins().stack_store(value.value, slot);
        self.scope.insert(
            decl.name.clone(),
            SymbolBinding { slot, ty: decl.ty },
        );
        Ok(())
    }

    // ======================================
    // Expressions
    // ======================================

    fn lower_expr(&mut self, expr: &Expr) -> Result<Typed> {
        match expr {
            Expr::Literal(literal) => self.lower_literal(literal),
            Expr::Identifier(ident) => self.lower_identifier(ident),
            Expr::BinaryOp(binary) => self.lower_binary(binary),
            Expr::Call(call) => match self.lower_call(call)? {
                Some(value) => Ok(value),
                None => Err(self.error(LowerError::VoidValue(format!(
                    "result of '{}'",
                    call.callee
                )))),
            },
        }
    }

    fn lower_literal(&mut self, literal: &Literal) -> Result<Typed> {
        let invalid = || LowerError::InvalidLiteral {
            ty: literal.ty,
            text: literal.text.clone(),
        };
        let ty = literal.ty;
        let value = match ty {
            PrimitiveType::F32 => match literal.text.parse::<f32>() {
                Ok(v) => self.builder.ins().f32const(v),
                Err(_) => return Err(self.error(invalid())),
            },
            PrimitiveType::F64 => match literal.text.parse::<f64>() {
                Ok(v) => self.builder.ins().f64const(v),
                Err(_) => return Err(self.error(invalid())),
            },
            PrimitiveType::Str => {
                let data = self.builder.intern_string(literal.text.as_bytes());
                self.builder.ins().data_addr(data)
            }
            ty if ty.is_integer() => {
                let ir_ty = self.ir_type(ty)?;
                let value = literal
                    .text
                    .parse::<i128>()
                    .ok()
                    .filter(|&v| literal_fits(v, ir_ty.bits()))
                    .ok_or_else(|| self.error(invalid()))?;
                self.builder.ins().iconst(ir_ty, value as i64)
            }
            _ => return Err(self.error(invalid())),
        };
        Ok(Typed { value, ty })
    }

    fn lower_identifier(&mut self, ident: &Identifier) -> Result<Typed> {
        if let Some(binding) = self.scope.get(&ident.name).copied() {
            let value = self.builder.ins().stack_load(binding.slot);
            return Ok(Typed {
                value,
                ty: binding.ty,
            });
        }
        if let Some(global) = self.decls.globals.get(&ident.name).copied() {
            let value = self.builder.ins().global_load(global.id);
            return Ok(Typed {
                value,
                ty: global.ty,
            });
        }
        Err(self.error(LowerError::UnresolvedIdentifier(ident.name.clone())))
    }

    fn lower_binary(&mut self, binary: &BinaryOp) -> Result<Typed> {
        let lhs = self.lower_expr(&binary.lhs)?;
        let rhs = self.lower_expr(&binary.rhs)?;
        let (lhs, rhs) = self.unify(lhs, rhs)?;

        let ty = lhs.ty;
        let unsupported = Error::lower(
            LowerError::UnsupportedOperator { op: binary.op, ty },
            self.line,
        );
        let (l, r) = (lhs.value, rhs.value);
        let mut ins = self.builder.ins();
        let value = if ty.is_float() {
            match binary.op {
                ArithmeticOperator::Add => ins.fadd(l, r),
                ArithmeticOperator::Sub => ins.fsub(l, r),
                ArithmeticOperator::Mul => ins.fmul(l, r),
                ArithmeticOperator::Div => ins.fdiv(l, r),
                ArithmeticOperator::Mod => return Err(unsupported),
            }
        } else if ty.is_integer() {
            match binary.op {
                ArithmeticOperator::Add => ins.iadd(l, r),
                ArithmeticOperator::Sub => ins.isub(l, r),
                ArithmeticOperator::Mul => ins.imul(l, r),
                ArithmeticOperator::Div => ins.idiv_s(l, r),
                ArithmeticOperator::Mod => ins.irem_s(l, r),
            }
        } else {
            return Err(unsupported);
        };
        Ok(Typed { value, ty })
    }

    /// Bring both operands to one type. The strictly lower-priority side is
    /// converted; on a tie the left side takes the right side's type.
    fn unify(&mut self, lhs: Typed, rhs: Typed) -> Result<(Typed, Typed)> {
        if priority(lhs.ty) > priority(rhs.ty) {
            let rhs = self.coerce(rhs, lhs.ty)?;
            Ok((lhs, rhs))
        } else {
            let lhs = self.coerce(lhs, rhs.ty)?;
            Ok((lhs, rhs))
        }
    }

    /// Convert `value` to `target`. Emits nothing when the types already
    /// agree or share one IR representation.
    fn coerce(&mut self, value: Typed, target: PrimitiveType) -> Result<Typed> {
        let from = value.ty;
        if from == target {
            return Ok(value);
        }
        let to_ir = self.ir_type(target)?;
        let from_ir = self.builder.value_type(value.value);
        let v = value.value;
        let line = self.line;
        let mut ins = self.builder.ins();

        let converted = if from.is_integer() && target.is_integer() {
            let (from_bits, to_bits) = (from_ir.bits(), to_ir.bits());
            if to_bits > from_bits {
                if from.is_signed() {
                    ins.extend_s(v, to_ir)
                } else {
                    ins.extend_u(v, to_ir)
                }
            } else if to_bits < from_bits {
                ins.wrap(v, to_ir)
            } else {
                v
            }
        } else if from.is_pointer() && target.is_pointer() {
            v
        } else if from.is_integer() && target.is_pointer() {
            ins.int_to_ptr(v)
        } else if from.is_pointer() && target.is_integer() {
            ins.ptr_to_int(v, to_ir)
        } else if from.is_float() && target.is_float() {
            if to_ir.bits() > from_ir.bits() {
                ins.float_promote(v, to_ir)
            } else {
                ins.float_demote(v, to_ir)
            }
        } else if from.is_integer() && target.is_float() {
            ins.int_to_float_s(v, to_ir)
        } else if from.is_float() && target.is_integer() {
            ins.float_to_int_s(v, to_ir)
        } else {
            return Err(Error::lower(LowerError::UnsupportedCast { from, to: target }, line));
        };

        Ok(Typed {
            value: converted,
            ty: target,
        })
    }

    /// Lower a call; `None` when the callee returns `void`.
    fn lower_call(&mut self, call: &Call) -> Result<Option<Typed>> {
        self.line = call.line;
        let decls = self.decls;
        let Some(info) = decls.functions.get(&call.callee) else {
            return Err(self.error(LowerError::UnresolvedCallee(call.callee.clone())));
        };

        let expected = info.params.len();
        let found = call.args.len();
        if found < expected || (!info.variadic && found > expected) {
            return Err(self.error(LowerError::ArgumentCount {
                callee: call.callee.clone(),
                expected,
                found,
                variadic: info.variadic,
            }));
        }

        let promote_floats = call.callee == PRINTF;
        let mut args = Vec::with_capacity(found);
        for (index, arg) in call.args.iter().enumerate() {
            let mut value = self.lower_expr(arg)?;
            self.line = call.line;
            if promote_floats && value.ty == PrimitiveType::F32 {
                value = self.coerce(value, PrimitiveType::F64)?;
            }
            if let Some(&param) = info.params.get(index) {
                if self.ir_type(param)? != self.builder.value_type(value.value) {
                    return Err(self.error(LowerError::ArgumentType {
                        callee: call.callee.clone(),
                        index,
                        expected: param,
                        found: value.ty,
                    }));
                }
            }
            args.push(value.value);
        }

        let inst = self.builder.ins().call(info.id, &args);
        Ok(self
            .builder
            .inst_result(inst)
            .map(|value| Typed { value, ty: info.ret }))
    }
}

fn stmt_line(stmt: &Stmt) -> Option<u64> {
    match stmt {
        Stmt::LocalDecl(decl) => Some(decl.line),
        Stmt::Return(ret) => Some(ret.line),
        Stmt::Call(call) => Some(call.line),
        Stmt::Compound(_) => None,
    }
}

/// Whether a non-negative literal is representable in `bits`, signed or
/// unsigned. Constants are stored as `i64`, which bounds 128-bit literals.
fn literal_fits(value: i128, bits: u32) -> bool {
    if bits >= 64 {
        return i64::try_from(value).is_ok();
    }
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << bits) - 1;
    (min..=max).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use ferrule_ir::inst::InstructionData;
    use ferrule_ir::{Function, Opcode};

    fn compile_with(source: &str, sink: &mut CollectingSink) -> Result<Module> {
        let tokens = Lexer::new(source).tokenize(sink)?;
        let program = Parser::new(&tokens, sink).parse_program()?;
        Generator::new("test", sink).lower(&program)
    }

    fn compile(source: &str) -> Module {
        let mut sink = CollectingSink::new();
        match compile_with(source, &mut sink) {
            Ok(module) => module,
            Err(err) => panic!("{}", err),
        }
    }

    fn lower_err(source: &str) -> Error {
        let mut sink = CollectingSink::new();
        let err = compile_with(source, &mut sink).unwrap_err();
        assert_eq!(sink.count(Severity::Error), 1);
        err
    }

    fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
        let id = module.find_function_by_name(name).unwrap();
        module.get_function(id)
    }

    fn opcodes(func: &Function) -> Vec<Opcode> {
        func.dfg
            .instructions
            .values()
            .map(|data| data.opcode())
            .collect()
    }

    fn decl(name: &str, return_type: PrimitiveType) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            is_external: false,
            params: vec![],
            return_type,
            body: Some(CompoundStmt::default()),
            line: 1,
        }
    }

    #[test]
    fn test_type_table_covers_all_but_invalid() {
        let table = TypeTable::new();
        for ty in PrimitiveType::ALL {
            assert_eq!(table.get(ty).is_some(), ty != PrimitiveType::Invalid, "{}", ty);
        }
        assert_eq!(table.get(PrimitiveType::U16), Some(Type::I16));
        assert_eq!(table.get(PrimitiveType::Str), Some(Type::Ptr));
        assert_eq!(table.get(PrimitiveType::F32Ptr), Some(Type::Ptr));
        assert_eq!(
            table.lower(PrimitiveType::Invalid),
            Err(LowerError::UnmappedType(PrimitiveType::Invalid))
        );
    }

    #[test]
    fn test_priority() {
        assert_eq!(priority(PrimitiveType::I8), 8);
        assert_eq!(priority(PrimitiveType::U64), 64);
        assert_eq!(priority(PrimitiveType::I128), 128);
        assert_eq!(priority(PrimitiveType::F32), 132);
        assert_eq!(priority(PrimitiveType::F64), 164);
        assert_eq!(priority(PrimitiveType::I32Ptr), 2);
        assert_eq!(priority(PrimitiveType::Str), 2);
        assert_eq!(priority(PrimitiveType::Void), 0);
        assert_eq!(priority(PrimitiveType::Invalid), -1);
    }

    #[test]
    fn test_coerce_same_type_emits_nothing() {
        let types = TypeTable::new();
        let decls = Declarations::default();
        let owner = decl("f", PrimitiveType::Void);
        let mut mb = ModuleBuilder::new();
        let sig = mb.make_signature(vec![], Type::Void, false, CallConv::SystemV);
        let id = mb.declare_function("f".to_string(), sig, Linkage::Local);
        let mut lowering = FunctionLowering::new(mb.builder(id), &types, &decls, &owner);

        for ty in PrimitiveType::ALL {
            let Some(ir_ty) = types.get(ty).filter(|&t| t != Type::Void) else {
                continue;
            };
            let slot = lowering.builder.create_stack_slot(ir_ty, "tmp");
            let value = lowering.builder.ins().stack_load(slot);
            let before = lowering.builder.func().dfg.instructions.len();
            let typed = Typed { value, ty };
            assert_eq!(lowering.coerce(typed, ty).unwrap(), typed);
            assert_eq!(lowering.builder.func().dfg.instructions.len(), before);
        }
    }

    #[test]
    fn test_pointer_coercion_emits_nothing() {
        let types = TypeTable::new();
        let decls = Declarations::default();
        let owner = decl("f", PrimitiveType::Void);
        let mut mb = ModuleBuilder::new();
        let sig = mb.make_signature(vec![], Type::Void, false, CallConv::SystemV);
        let id = mb.declare_function("f".to_string(), sig, Linkage::Local);
        let mut lowering = FunctionLowering::new(mb.builder(id), &types, &decls, &owner);

        let slot = lowering.builder.create_stack_slot(Type::Ptr, "p");
        let value = lowering.builder.ins().stack_load(slot);
        let before = lowering.builder.func().dfg.instructions.len();
        for (from, to) in [
            (PrimitiveType::I32Ptr, PrimitiveType::F32Ptr),
            (PrimitiveType::Str, PrimitiveType::I8Ptr),
            (PrimitiveType::U64Ptr, PrimitiveType::I8Ptr),
        ] {
            let coerced = lowering.coerce(Typed { value, ty: from }, to).unwrap();
            assert_eq!(coerced, Typed { value, ty: to });
        }
        assert_eq!(lowering.builder.func().dfg.instructions.len(), before);
    }

    #[test]
    fn test_literal_constants() {
        let types = TypeTable::new();
        let decls = Declarations::default();
        let owner = decl("f", PrimitiveType::Void);
        let mut mb = ModuleBuilder::new();
        let sig = mb.make_signature(vec![], Type::Void, false, CallConv::SystemV);
        let id = mb.declare_function("f".to_string(), sig, Linkage::Local);
        let mut lowering = FunctionLowering::new(mb.builder(id), &types, &decls, &owner);

        let int = lowering
            .lower_literal(&Literal {
                ty: PrimitiveType::I32,
                text: "42".to_string(),
            })
            .unwrap();
        assert_eq!(int.ty, PrimitiveType::I32);
        assert_eq!(
            lowering.builder.func().dfg.as_const(int.value),
            Some(Constant::I32(42))
        );

        let float = lowering
            .lower_literal(&Literal {
                ty: PrimitiveType::F64,
                text: "3.5".to_string(),
            })
            .unwrap();
        match lowering.builder.func().dfg.as_const(float.value) {
            Some(Constant::F64(v)) => assert!((v - 3.5).abs() < f64::EPSILON),
            other => panic!("expected an f64 constant, got {:?}", other),
        }

        let err = lowering
            .lower_literal(&Literal {
                ty: PrimitiveType::I8,
                text: "300".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err.lower_kind(),
            Some(LowerError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_duplicate_local_is_redeclaration() {
        let err = lower_err("fn f() -> void {\n  let a : i32 = 1;\n  let a : i32 = 2;\n}");
        assert_eq!(
            err,
            Error::lower(LowerError::Redeclaration("a".to_string()), 3)
        );
    }

    #[test]
    fn test_scopes_are_per_function() {
        let module = compile(
            "fn f() -> i32 { let a : i32 = 1; return a; }
             fn g() -> i32 { let a : i32 = 2; return a; }",
        );
        assert_eq!(function(&module, "g").stack_slots.len(), 1);
    }

    #[test]
    fn test_undeclared_callee() {
        let err = lower_err("fn main() -> i32 { missing(); return 0; }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::UnresolvedCallee("missing".to_string()))
        );
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = lower_err("fn main() -> i32 { return nope; }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::UnresolvedIdentifier("nope".to_string()))
        );
    }

    #[test]
    fn test_printf_promotes_f32_arguments() {
        let module = compile(
            "fn extern printf(fmt: i8*, ...) -> i32;
             fn main() -> i32 {
                 let x : f32 = 1.5;
                 printf(\"%f\\n\", x);
                 return 0;
             }",
        );
        let main = function(&module, "main");
        let call = main
            .dfg
            .instructions
            .values()
            .find_map(|data| match data {
                InstructionData::Call { args, .. } => Some(args.clone()),
                _ => None,
            })
            .unwrap();
        let args = main.dfg.get_value_list(call);
        assert_eq!(args.len(), 2);
        assert_eq!(main.dfg.value_type(args[0]), Type::Ptr);
        assert_eq!(main.dfg.value_type(args[1]), Type::F64);
        assert!(opcodes(main).contains(&Opcode::FloatPromote));
    }

    #[test]
    fn test_other_callees_are_not_promoted() {
        let module = compile(
            "fn extern log_value(fmt: i8*, ...) -> void;
             fn main() -> i32 {
                 let x : f32 = 1.5;
                 log_value(\"%f\", x);
                 return 0;
             }",
        );
        // The only promotion is the f64 literal demoted into `x`.
        assert!(!opcodes(function(&module, "main")).contains(&Opcode::FloatPromote));
    }

    #[test]
    fn test_priority_coercion() {
        let module = compile(
            "fn widen(a: i64, b: i32) -> i64 { return a + b; }
             fn tie(a: u32, b: i32) -> i32 { return a * b; }
             fn mixed(a: i32, b: f32) -> f32 { return a - b; }
             fn unsigned(a: u8, b: i16) -> i16 { return a / b; }",
        );
        assert!(opcodes(function(&module, "widen")).contains(&Opcode::ExtendS));
        let tie = opcodes(function(&module, "tie"));
        assert!(!tie.iter().any(|op| op.is_conversion()));
        assert!(tie.contains(&Opcode::IMul));
        let mixed = opcodes(function(&module, "mixed"));
        assert!(mixed.contains(&Opcode::IntToFloatS));
        assert!(mixed.contains(&Opcode::FSub));
        let unsigned = opcodes(function(&module, "unsigned"));
        assert!(unsigned.contains(&Opcode::ExtendU));
        assert!(unsigned.contains(&Opcode::IDivS));
    }

    #[test]
    fn test_return_is_coerced() {
        let module = compile("fn f() -> i64 { return 7; } fn g() -> i8 { return 7; }");
        assert!(opcodes(function(&module, "f")).contains(&Opcode::ExtendS));
        assert!(opcodes(function(&module, "g")).contains(&Opcode::Wrap));
    }

    #[test]
    fn test_float_modulus_rejected() {
        let err = lower_err("fn f(a: f64, b: i32) -> f64 { return a % b; }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::UnsupportedOperator {
                op: ArithmeticOperator::Mod,
                ty: PrimitiveType::F64
            })
        );
    }

    #[test]
    fn test_pointer_arithmetic_rejected() {
        let err = lower_err("fn f(a: i8*, b: i8*) -> i32 { return a + b; }");
        assert!(matches!(
            err.lower_kind(),
            Some(LowerError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn test_unsupported_cast() {
        let err = lower_err("fn f(p: f64*) -> f64 { return p; }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::UnsupportedCast {
                from: PrimitiveType::F64Ptr,
                to: PrimitiveType::F64
            })
        );
    }

    #[test]
    fn test_nested_block_rejected() {
        let err = lower_err("fn f() -> void {\n  { let a : i32 = 1; }\n}");
        assert_eq!(err.lower_kind(), Some(&LowerError::NestedBlock));
    }

    #[test]
    fn test_missing_return_and_implicit_void_return() {
        let err = lower_err("fn f() -> i32 { let a : i32 = 1; }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::MissingReturn("f".to_string()))
        );

        let module = compile("fn g() -> void { }");
        assert_eq!(opcodes(function(&module, "g")), vec![Opcode::Return]);
    }

    #[test]
    fn test_unreachable_statement() {
        let err = lower_err("fn f() -> i32 {\n  return 1;\n  return 2;\n}");
        assert_eq!(err, Error::lower(LowerError::UnreachableCode, 3));
    }

    #[test]
    fn test_globals() {
        let module = compile(
            "let counter : i64 = 7;
             let narrow : i8 = 300;
             fn main() -> i64 { return counter; }",
        );
        let counter = module.find_global_by_name("counter").unwrap();
        assert_eq!(counter.ty, Type::I64);
        assert_eq!(counter.linkage, Linkage::Export);
        assert_eq!(counter.init, Some(Constant::I64(7)));
        assert_eq!(
            module.find_global_by_name("narrow").unwrap().init,
            Some(Constant::I8(44))
        );
        assert!(opcodes(function(&module, "main")).contains(&Opcode::GlobalLoad));
    }

    #[test]
    fn test_global_initializer_must_be_integer_literal() {
        let err = lower_err("let x : f64 = 1.5;");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::UnsupportedGlobalInitializer("x".to_string()))
        );
        let err = lower_err("let x : i32 = 1 + 2;");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::UnsupportedGlobalInitializer("x".to_string()))
        );
        let err = lower_err("let x : i32 = 1;\nlet x : i32 = 2;");
        assert_eq!(err, Error::lower(LowerError::Redeclaration("x".to_string()), 2));
    }

    #[test]
    fn test_prototype_reuse_and_linkage() {
        let module = compile(
            "fn extern helper(x: i32) -> i32;
             fn helper(x: i32) -> i32 { return x; }
             fn local() -> void { }
             fn main() -> i32 { return helper(1); }",
        );
        let helper = function(&module, "helper");
        assert!(helper.is_defined());
        assert_eq!(helper.linkage, Linkage::Export);
        assert_eq!(function(&module, "local").linkage, Linkage::Local);
        assert_eq!(function(&module, "main").linkage, Linkage::Export);
        assert_eq!(module.functions.len(), 3);
    }

    #[test]
    fn test_conflicting_and_duplicate_definitions() {
        let err = lower_err("fn f(x: i32) -> i32;\nfn f(x: i64) -> i32;");
        assert_eq!(
            err,
            Error::lower(LowerError::ConflictingDeclaration("f".to_string()), 2)
        );
        let err = lower_err("fn f() -> void { }\nfn f() -> void { }");
        assert_eq!(err, Error::lower(LowerError::Redefinition("f".to_string()), 2));
    }

    #[test]
    fn test_undefined_prototype_warning() {
        let mut sink = CollectingSink::new();
        compile_with(
            "fn helper() -> void;
             fn extern puts(s: i8*) -> i32;
             fn main() -> i32 { return 0; }",
            &mut sink,
        )
        .unwrap();
        assert_eq!(sink.count(Severity::Warning), 1);
        assert_eq!(sink.count(Severity::Error), 0);
    }

    #[test]
    fn test_call_argument_checks() {
        let err = lower_err("fn extern printf(fmt: i8*, ...) -> i32;\nfn main() -> i32 { printf(); return 0; }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::ArgumentCount {
                callee: "printf".to_string(),
                expected: 1,
                found: 0,
                variadic: true
            })
        );
        let err = lower_err("fn g(x: i64) -> void;\nfn main() -> i32 { g(1); return 0; }");
        assert!(matches!(
            err.lower_kind(),
            Some(LowerError::ArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn test_no_implicit_widening_at_call_sites() {
        let err = lower_err("fn g(x: i64) -> void { }\nfn main() -> i32 {\n  g(1);\n  return 0;\n}");
        assert_eq!(
            err,
            Error::lower(
                LowerError::ArgumentType {
                    callee: "g".to_string(),
                    index: 0,
                    expected: PrimitiveType::I64,
                    found: PrimitiveType::I32,
                },
                3
            )
        );

        let module = compile(
            "fn g(x: i64) -> void { }\nfn main() -> i32 {\n  let one : i64 = 1;\n  g(one);\n  return 0;\n}",
        );
        // only the local's initializer is widened
        let ops = opcodes(function(&module, "main"));
        assert_eq!(ops.iter().filter(|&&op| op == Opcode::ExtendS).count(), 1);
    }

    #[test]
    fn test_void_call_in_expression() {
        let err = lower_err("fn g() -> void { }\nfn main() -> i32 { return g(); }");
        assert_eq!(
            err.lower_kind(),
            Some(&LowerError::VoidValue("result of 'g'".to_string()))
        );
    }

    #[test]
    fn test_parameters_are_bound() {
        let module = compile("fn add(a: i32, b: i32) -> i32 { return a + b; }");
        let add = function(&module, "add");
        assert_eq!(add.stack_slots.len(), 2);
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_validation_error_carries_function_line() {
        let mut sink = CollectingSink::new();
        let mut generator = Generator::new("test", &mut sink);
        let mut f = decl("f", PrimitiveType::Void);
        f.line = 7;
        generator.lower_function(&f).unwrap();

        let in_function = ferrule_ir::Error::InFunction {
            name: "f".to_string(),
            source: ferrule_ir::ValidationError::Other("bad".to_string()),
        };
        let err = generator.validation_error(in_function);
        assert_eq!(err.line(), 7);
        assert!(matches!(err.lower_kind(), Some(LowerError::InvalidIr(_))));

        let module_level = ferrule_ir::Error::Message("bad".to_string());
        assert_eq!(generator.validation_error(module_level).line(), 0);
    }
}
