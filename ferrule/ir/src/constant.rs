use crate::types::Type;
use core::fmt;

/// A compile-time constant, used for global initializers and constant queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    F32(f32),
    F64(f64),
}

impl Constant {
    /// Build an integer constant of type `ty`, wrapping `value` to its width.
    /// Float types receive the value converted; other types have no constant form.
    pub fn from_int(ty: Type, value: i128) -> Option<Self> {
        Some(match ty {
            Type::I8 => Constant::I8(value as i8),
            Type::I16 => Constant::I16(value as i16),
            Type::I32 => Constant::I32(value as i32),
            Type::I64 => Constant::I64(value as i64),
            Type::I128 => Constant::I128(value),
            Type::F32 => Constant::F32(value as f32),
            Type::F64 => Constant::F64(value as f64),
            Type::Ptr | Type::Void => return None,
        })
    }

    pub fn ty(&self) -> Type {
        match self {
            Constant::I8(_) => Type::I8,
            Constant::I16(_) => Type::I16,
            Constant::I32(_) => Type::I32,
            Constant::I64(_) => Type::I64,
            Constant::I128(_) => Type::I128,
            Constant::F32(_) => Type::F32,
            Constant::F64(_) => Type::F64,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Constant::I8(v) => Some(*v as i64),
            Constant::I16(v) => Some(*v as i64),
            Constant::I32(v) => Some(*v as i64),
            Constant::I64(v) => Some(*v),
            Constant::I128(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::I8(v) => write!(f, "{}", v),
            Constant::I16(v) => write!(f, "{}", v),
            Constant::I32(v) => write!(f, "{}", v),
            Constant::I64(v) => write!(f, "{}", v),
            Constant::I128(v) => write!(f, "{}", v),
            Constant::F32(v) => write!(f, "{:?}", v),
            Constant::F64(v) => write!(f, "{:?}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_int_wraps_to_width() {
        assert_eq!(Constant::from_int(Type::I8, 300), Some(Constant::I8(44)));
        assert_eq!(Constant::from_int(Type::I32, -1), Some(Constant::I32(-1)));
        assert_eq!(Constant::from_int(Type::F64, 5), Some(Constant::F64(5.0)));
        assert_eq!(Constant::from_int(Type::Ptr, 0), None);
    }

    #[test]
    fn test_as_i64_for_wide_values() {
        assert_eq!(Constant::I128(7).as_i64(), Some(7));
        assert_eq!(Constant::I128(i128::MAX).as_i64(), None);
        assert_eq!(Constant::F32(1.5).as_i64(), None);
    }
}
