use super::dfg::DataFlowGraph;
use super::layout::Layout;
use super::module::Linkage;
use super::types::{Block, SigId, StackSlot, Type};
use alloc::string::String;
use cranelift_entity::PrimaryMap;

/// A typed, optionally named stack allocation.
#[derive(Debug, Clone)]
pub struct StackSlotData {
    pub ty: Type,
    pub name: String,
}

impl StackSlotData {
    pub fn size(&self) -> u32 {
        self.ty.size_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub signature: SigId,
    pub linkage: Linkage,
    pub dfg: DataFlowGraph,
    pub layout: Layout,
    pub stack_slots: PrimaryMap<StackSlot, StackSlotData>,
    pub entry_block: Option<Block>,
}

impl Function {
    pub fn new(name: String, signature: SigId, linkage: Linkage) -> Self {
        Self {
            name,
            signature,
            linkage,
            dfg: DataFlowGraph::new(),
            layout: Layout::new(),
            stack_slots: PrimaryMap::new(),
            entry_block: None,
        }
    }

    /// A function with an entry block has a body; otherwise it is only a declaration.
    pub fn is_defined(&self) -> bool {
        self.entry_block.is_some()
    }
}
