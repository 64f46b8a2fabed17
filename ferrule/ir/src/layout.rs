use super::inst::Inst;
use super::types::{Block, Value};
use alloc::vec::Vec;
use cranelift_entity::PrimaryMap;

#[derive(Debug, Clone, Default)]
pub struct BlockData {
    pub params: Vec<Value>,
    pub insts: Vec<Inst>,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub blocks: PrimaryMap<Block, BlockData>,
    pub block_order: Vec<Block>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    pub fn append_block(&mut self, block: Block) {
        self.block_order.push(block);
    }

    pub fn append_inst(&mut self, block: Block, inst: Inst) {
        self.blocks[block].insts.push(inst);
    }

    pub fn last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].insts.last().copied()
    }
}
