#![no_std]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate alloc;

pub mod builder;
pub mod constant;
pub mod dfg;
pub mod error;
pub mod function;
pub mod inst;
pub mod layout;
pub mod module;
pub mod opcode;
pub mod printer;
pub mod types;
pub mod validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// Standard System V ABI (e.g., for standard C functions on Linux)
    SystemV,
}

impl core::fmt::Display for CallConv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CallConv::SystemV => write!(f, "system_v"),
        }
    }
}

pub use builder::{FunctionBuilder, InstBuilder, ModuleBuilder};
pub use constant::Constant;
pub use error::{Error, Result};
pub use function::Function;
pub use module::{DataObject, Global, Linkage, Module, ModuleData};
pub use opcode::Opcode;
pub use types::{Block, DataId, FuncId, GlobalId, SigId, Signature, StackSlot, Type, Value, ValueList};
pub use validator::ValidationError;

pub use dfg::DataFlowGraph;
pub use inst::{Inst, InstructionData};
