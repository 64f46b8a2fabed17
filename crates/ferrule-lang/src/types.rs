//! Primitive types of the source language.

use std::fmt;

/// Every type a declaration, parameter or literal can carry.
///
/// Pointer variants exist for the sized scalar types only; `Str` is the type
/// of string literals and lowers to a plain pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Void,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    I8Ptr,
    I16Ptr,
    I32Ptr,
    I64Ptr,
    U8Ptr,
    U16Ptr,
    U32Ptr,
    U64Ptr,
    F32Ptr,
    F64Ptr,
    Str,
    Invalid,
}

impl PrimitiveType {
    /// All variants, in declaration order.
    pub const ALL: [PrimitiveType; 25] = [
        PrimitiveType::Void,
        PrimitiveType::I8,
        PrimitiveType::I16,
        PrimitiveType::I32,
        PrimitiveType::I64,
        PrimitiveType::I128,
        PrimitiveType::U8,
        PrimitiveType::U16,
        PrimitiveType::U32,
        PrimitiveType::U64,
        PrimitiveType::U128,
        PrimitiveType::F32,
        PrimitiveType::F64,
        PrimitiveType::I8Ptr,
        PrimitiveType::I16Ptr,
        PrimitiveType::I32Ptr,
        PrimitiveType::I64Ptr,
        PrimitiveType::U8Ptr,
        PrimitiveType::U16Ptr,
        PrimitiveType::U32Ptr,
        PrimitiveType::U64Ptr,
        PrimitiveType::F32Ptr,
        PrimitiveType::F64Ptr,
        PrimitiveType::Str,
        PrimitiveType::Invalid,
    ];

    /// Look up a builtin type keyword such as `i32` or `f64`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        let ty = match word {
            "void" => PrimitiveType::Void,
            "i8" => PrimitiveType::I8,
            "i16" => PrimitiveType::I16,
            "i32" => PrimitiveType::I32,
            "i64" => PrimitiveType::I64,
            "i128" => PrimitiveType::I128,
            "u8" => PrimitiveType::U8,
            "u16" => PrimitiveType::U16,
            "u32" => PrimitiveType::U32,
            "u64" => PrimitiveType::U64,
            "u128" => PrimitiveType::U128,
            "f32" => PrimitiveType::F32,
            "f64" => PrimitiveType::F64,
            _ => return None,
        };
        Some(ty)
    }

    /// The pointer variant of a base type, or `Invalid` when none exists.
    pub fn pointer_of(self) -> Self {
        match self {
            PrimitiveType::I8 => PrimitiveType::I8Ptr,
            PrimitiveType::I16 => PrimitiveType::I16Ptr,
            PrimitiveType::I32 => PrimitiveType::I32Ptr,
            PrimitiveType::I64 => PrimitiveType::I64Ptr,
            PrimitiveType::U8 => PrimitiveType::U8Ptr,
            PrimitiveType::U16 => PrimitiveType::U16Ptr,
            PrimitiveType::U32 => PrimitiveType::U32Ptr,
            PrimitiveType::U64 => PrimitiveType::U64Ptr,
            PrimitiveType::F32 => PrimitiveType::F32Ptr,
            PrimitiveType::F64 => PrimitiveType::F64Ptr,
            _ => PrimitiveType::Invalid,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::I8
                | PrimitiveType::I16
                | PrimitiveType::I32
                | PrimitiveType::I64
                | PrimitiveType::I128
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveType::U8
                | PrimitiveType::U16
                | PrimitiveType::U32
                | PrimitiveType::U64
                | PrimitiveType::U128
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveType::F32 | PrimitiveType::F64)
    }

    /// Pointer variants and `Str`, which is represented as a pointer.
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            PrimitiveType::I8Ptr
                | PrimitiveType::I16Ptr
                | PrimitiveType::I32Ptr
                | PrimitiveType::I64Ptr
                | PrimitiveType::U8Ptr
                | PrimitiveType::U16Ptr
                | PrimitiveType::U32Ptr
                | PrimitiveType::U64Ptr
                | PrimitiveType::F32Ptr
                | PrimitiveType::F64Ptr
                | PrimitiveType::Str
        )
    }

    /// Width in bits of integer and float types.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            PrimitiveType::I8 | PrimitiveType::U8 => Some(8),
            PrimitiveType::I16 | PrimitiveType::U16 => Some(16),
            PrimitiveType::I32 | PrimitiveType::U32 | PrimitiveType::F32 => Some(32),
            PrimitiveType::I64 | PrimitiveType::U64 | PrimitiveType::F64 => Some(64),
            PrimitiveType::I128 | PrimitiveType::U128 => Some(128),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimitiveType::Void => "void",
            PrimitiveType::I8 => "i8",
            PrimitiveType::I16 => "i16",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::I128 => "i128",
            PrimitiveType::U8 => "u8",
            PrimitiveType::U16 => "u16",
            PrimitiveType::U32 => "u32",
            PrimitiveType::U64 => "u64",
            PrimitiveType::U128 => "u128",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
            PrimitiveType::I8Ptr => "i8*",
            PrimitiveType::I16Ptr => "i16*",
            PrimitiveType::I32Ptr => "i32*",
            PrimitiveType::I64Ptr => "i64*",
            PrimitiveType::U8Ptr => "u8*",
            PrimitiveType::U16Ptr => "u16*",
            PrimitiveType::U32Ptr => "u32*",
            PrimitiveType::U64Ptr => "u64*",
            PrimitiveType::F32Ptr => "f32*",
            PrimitiveType::F64Ptr => "f64*",
            PrimitiveType::Str => "str",
            PrimitiveType::Invalid => "<invalid>",
        };
        write!(f, "{}", s)
    }
}
