use crate::constant::Constant;
use crate::function::Function;
use crate::types::{DataId, FuncId, GlobalId, SigId, Signature, Type};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Deref;
use cranelift_entity::PrimaryMap;
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Import,
    Export,
    Local,
}

impl Linkage {
    /// Visible outside the module, either as an import or an export.
    pub fn is_external(self) -> bool {
        matches!(self, Linkage::Import | Linkage::Export)
    }
}

impl core::fmt::Display for Linkage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Linkage::Import => write!(f, "import"),
            Linkage::Export => write!(f, "export"),
            Linkage::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub linkage: Linkage,
    pub init: Option<Constant>,
}

/// Interned read-only bytes, NUL terminated.
#[derive(Debug, Clone)]
pub struct DataObject {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default, Clone)]
pub struct ModuleData {
    /// Printed as a header comment when not empty
    pub name: String,
    pub functions: PrimaryMap<FuncId, Function>,
    pub signatures: PrimaryMap<SigId, Signature>,
    pub globals: PrimaryMap<GlobalId, Global>,
    pub data: PrimaryMap<DataId, DataObject>,
    sig_map: HashMap<Signature, SigId>,
    data_map: HashMap<Vec<u8>, DataId>,
}

impl ModuleData {
    pub fn get_func_id(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    pub fn get_global_id(&self, name: &str) -> Option<GlobalId> {
        self.globals
            .iter()
            .find(|(_, g)| g.name == name)
            .map(|(id, _)| id)
    }

    pub fn intern_signature(&mut self, signature: Signature) -> SigId {
        if let Some(&id) = self.sig_map.get(&signature) {
            id
        } else {
            let id = self.signatures.push(signature.clone());
            self.sig_map.insert(signature, id);
            id
        }
    }

    /// 字符串常量去重；返回的数据对象总以 NUL 结尾
    pub fn intern_data(&mut self, contents: &[u8]) -> DataId {
        let mut bytes = Vec::with_capacity(contents.len() + 1);
        bytes.extend_from_slice(contents);
        bytes.push(0);

        if let Some(&id) = self.data_map.get(&bytes) {
            return id;
        }
        let name = format!(".str.{}", self.data.len());
        let id = self.data.push(DataObject {
            name,
            bytes: bytes.clone(),
        });
        self.data_map.insert(bytes, id);
        id
    }

    pub fn declare_function(&mut self, name: String, sig_id: SigId, linkage: Linkage) -> FuncId {
        self.functions.push(Function::new(name, sig_id, linkage))
    }

    pub fn add_global(
        &mut self,
        name: String,
        ty: Type,
        linkage: Linkage,
        init: Option<Constant>,
    ) -> GlobalId {
        self.globals.push(Global {
            name,
            ty,
            linkage,
            init,
        })
    }

    pub fn func_signature(&self, func_id: FuncId) -> &Signature {
        &self.signatures[self.functions[func_id].signature]
    }
}

#[derive(Debug, Default, Clone)]
pub struct Module {
    pub(crate) inner: Arc<ModuleData>,
}

impl Module {
    pub fn find_function_by_name(&self, name: &str) -> Option<FuncId> {
        self.inner.get_func_id(name)
    }

    pub fn get_function(&self, func_id: FuncId) -> &Function {
        &self.inner.functions[func_id]
    }

    pub fn get_function_name(&self, func_id: FuncId) -> &str {
        &self.inner.functions[func_id].name
    }

    pub fn get_signature(&self, sig_id: SigId) -> &Signature {
        &self.inner.signatures[sig_id]
    }

    pub fn find_global_by_name(&self, name: &str) -> Option<&Global> {
        self.inner.get_global_id(name).map(|id| &self.inner.globals[id])
    }
}

impl Deref for Module {
    type Target = ModuleData;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
