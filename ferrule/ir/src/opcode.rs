use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Iconst,
    Fconst,
    // Integer Arithmetic
    IAdd,
    ISub,
    IMul,
    IDivS,
    IRemS,
    // Float Arithmetic
    FAdd,
    FSub,
    FMul,
    FDiv,
    // Conversions
    // Integer extension/truncation
    ExtendS,
    ExtendU,
    Wrap,
    FloatToIntS, // Float to signed int (truncate)
    IntToFloatS, // Signed int to float
    FloatPromote, // F32 -> F64
    FloatDemote,  // F64 -> F32
    IntToPtr,
    PtrToInt,
    // Memory
    StackLoad,
    StackStore,
    GlobalLoad,
    DataAddr,
    // Control
    Call,
    Return,
}

impl Opcode {
    pub fn is_conversion(self) -> bool {
        matches!(
            self,
            Opcode::ExtendS
                | Opcode::ExtendU
                | Opcode::Wrap
                | Opcode::FloatToIntS
                | Opcode::IntToFloatS
                | Opcode::FloatPromote
                | Opcode::FloatDemote
                | Opcode::IntToPtr
                | Opcode::PtrToInt
        )
    }

    pub fn is_float_arith(self) -> bool {
        matches!(self, Opcode::FAdd | Opcode::FSub | Opcode::FMul | Opcode::FDiv)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Iconst => "iconst",
            Opcode::Fconst => "fconst",
            Opcode::IAdd => "iadd",
            Opcode::ISub => "isub",
            Opcode::IMul => "imul",
            Opcode::IDivS => "idiv_s",
            Opcode::IRemS => "irem_s",
            Opcode::FAdd => "fadd",
            Opcode::FSub => "fsub",
            Opcode::FMul => "fmul",
            Opcode::FDiv => "fdiv",
            Opcode::ExtendS => "extend_s",
            Opcode::ExtendU => "extend_u",
            Opcode::Wrap => "wrap",
            Opcode::FloatToIntS => "float_to_int_s",
            Opcode::IntToFloatS => "int_to_float_s",
            Opcode::FloatPromote => "float_promote",
            Opcode::FloatDemote => "float_demote",
            Opcode::IntToPtr => "int_to_ptr",
            Opcode::PtrToInt => "ptr_to_int",
            Opcode::StackLoad => "stack_load",
            Opcode::StackStore => "stack_store",
            Opcode::GlobalLoad => "global_load",
            Opcode::DataAddr => "data_addr",
            Opcode::Call => "call",
            Opcode::Return => "ret",
        };
        write!(f, "{}", s)
    }
}
