//! Builder integration tests

use ferrule_ir::{
    CallConv, Constant, Linkage, ModuleBuilder, Type,
    inst::InstructionData,
};

#[test]
fn test_constants_resolve() {
    let mut mb = ModuleBuilder::new();
    let sig_id = mb.make_signature(vec![], Type::I32, false, CallConv::SystemV);
    let func_id = mb.declare_function("answer".to_string(), sig_id, Linkage::Export);
    let mut builder = mb.builder(func_id);
    builder.init_entry_block();

    let small = builder.ins().iconst(Type::I8, 300);
    let half = builder.ins().f64const(3.5);
    let answer = builder.ins().i32const(42);

    let dfg = &builder.func().dfg;
    assert_eq!(dfg.as_const(small), Some(Constant::I8(44)));
    assert_eq!(dfg.as_const(half), Some(Constant::F64(3.5)));
    assert_eq!(dfg.as_const(answer), Some(Constant::I32(42)));

    builder.ins().ret(Some(answer));
    assert!(mb.validate().is_ok());
}

#[test]
fn test_entry_block_params_follow_signature() {
    let mut mb = ModuleBuilder::new();
    let sig_id = mb.make_signature(
        vec![Type::I32, Type::F64],
        Type::F64,
        false,
        CallConv::SystemV,
    );
    let func_id = mb.declare_function("mix".to_string(), sig_id, Linkage::Local);
    let mut builder = mb.builder(func_id);
    builder.init_entry_block();

    let a = builder.func_param(0);
    let b = builder.func_param(1);
    assert_eq!(builder.value_type(a), Type::I32);
    assert_eq!(builder.value_type(b), Type::F64);

    let af = builder.ins().int_to_float_s(a, Type::F64);
    let sum = builder.ins().fadd(af, b);
    builder.ins().ret(Some(sum));
    assert!(builder.is_current_block_terminated());

    let module = mb.build();
    assert!(module.validate().is_ok());
    assert!(module.get_function(func_id).is_defined());
}

#[test]
fn test_signatures_and_strings_are_interned() {
    let mut mb = ModuleBuilder::new();
    let a = mb.make_signature(vec![Type::Ptr], Type::I32, true, CallConv::SystemV);
    let b = mb.make_signature(vec![Type::Ptr], Type::I32, true, CallConv::SystemV);
    let c = mb.make_signature(vec![Type::Ptr], Type::I32, false, CallConv::SystemV);
    assert_eq!(a, b);
    assert_ne!(a, c);

    let s1 = mb.intern_string(b"hello");
    let s2 = mb.intern_string(b"hello");
    let s3 = mb.intern_string(b"world");
    assert_eq!(s1, s2);
    assert_ne!(s1, s3);

    let module = mb.build();
    assert_eq!(module.data[s1].bytes, b"hello\0".to_vec());
    assert_eq!(module.data.len(), 2);
}

#[test]
fn test_call_result_follows_callee_signature() {
    let mut mb = ModuleBuilder::new();
    let void_sig = mb.make_signature(vec![], Type::Void, false, CallConv::SystemV);
    let i64_sig = mb.make_signature(vec![], Type::I64, false, CallConv::SystemV);
    let tick = mb.declare_function("tick".to_string(), void_sig, Linkage::Import);
    let now = mb.declare_function("now".to_string(), i64_sig, Linkage::Import);
    let main = mb.declare_function("main".to_string(), i64_sig, Linkage::Export);

    let mut builder = mb.builder(main);
    builder.init_entry_block();
    let tick_call = builder.ins().call(tick, &[]);
    let now_call = builder.ins().call(now, &[]);
    assert_eq!(builder.inst_result(tick_call), None);
    let value = builder.inst_result(now_call).expect("call returns i64");
    assert_eq!(builder.value_type(value), Type::I64);
    builder.ins().ret(Some(value));

    let module = mb.build();
    let func = module.get_function(main);
    let entry = func.entry_block.expect("main has a body");
    let first = func.layout.blocks[entry].insts[0];
    assert!(matches!(
        func.dfg.inst(first),
        InstructionData::Call { func_id, .. } if *func_id == tick
    ));
    assert!(module.validate().is_ok());
}

#[test]
fn test_duplicate_global_rejected() {
    let mut mb = ModuleBuilder::new();
    mb.add_global("g".to_string(), Type::I32, Linkage::Export, Some(Constant::I32(1)))
        .unwrap();
    assert!(
        mb.add_global("g".to_string(), Type::I32, Linkage::Export, None)
            .is_err()
    );
    assert!(
        mb.add_global("h".to_string(), Type::I16, Linkage::Export, Some(Constant::I32(1)))
            .is_err()
    );
    let module = mb.build();
    assert_eq!(module.find_global_by_name("g").map(|g| g.ty), Some(Type::I32));
}
