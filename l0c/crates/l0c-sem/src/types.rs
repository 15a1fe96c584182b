//! Semantic types.
//!
//! The [`Type`] sum covers the builtins, user structs and enums (referenced
//! by defining module plus name), pointers, nullables, and function types.
//!
//! Invariants: `Nullable(Nullable(_))` never exists, and `Void` never nests
//! inside a container type. Both are enforced at type-reference resolution.

use std::fmt;

use l0c_util::DottedName;

/// A resolved semantic type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer.
    Int,
    /// 8-bit unsigned byte.
    Byte,
    /// Boolean.
    Bool,
    /// ARC heap/static string.
    String,
    /// No value; only valid as a bare function result.
    Void,
    /// User struct, by value.
    Struct { module: DottedName, name: String },
    /// User enum, by value.
    Enum { module: DottedName, name: String },
    /// Pointer.
    Pointer(Box<Type>),
    /// Nullable wrapper; the inner type is never itself nullable.
    Nullable(Box<Type>),
    /// Function type.
    Func {
        params: Vec<Type>,
        result: Box<Type>,
    },
}

impl Type {
    /// Returns true for `int` and `byte`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Byte)
    }

    /// Returns true for the equality-comparable builtins.
    pub fn is_eq_builtin(&self) -> bool {
        matches!(self, Type::Int | Type::Byte | Type::Bool | Type::String)
    }

    /// Returns true for nullable types.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }

    /// Wrap in `Nullable`, flattening if already nullable.
    pub fn nullable(self) -> Type {
        match self {
            Type::Nullable(_) => self,
            other => Type::Nullable(Box::new(other)),
        }
    }

    /// The payload of a nullable type, or the type itself.
    pub fn strip_nullable(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner,
            other => other,
        }
    }

    /// The pointee if this is a (non-nullable) pointer.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Byte => write!(f, "byte"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Struct { module, name } | Type::Enum { module, name } => {
                write!(f, "{}::{}", module, name)
            }
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Nullable(inner) => write!(f, "{}?", inner),
            Type::Func { params, result } => {
                write!(f, "func(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn struct_ty(name: &str) -> Type {
        Type::Struct {
            module: DottedName::parse("m").unwrap(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_nullable_flattens() {
        let t = Type::Int.nullable().nullable();
        assert_eq!(t, Type::Nullable(Box::new(Type::Int)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(
            Type::Pointer(Box::new(struct_ty("Point"))).to_string(),
            "m::Point*"
        );
        assert_eq!(
            Type::Nullable(Box::new(Type::Pointer(Box::new(struct_ty("Point"))))).to_string(),
            "m::Point*?"
        );
        assert_eq!(
            Type::Func {
                params: vec![Type::Int, Type::String],
                result: Box::new(Type::Bool),
            }
            .to_string(),
            "func(int, string) -> bool"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(Type::Byte.is_numeric());
        assert!(!Type::Bool.is_numeric());
        assert!(Type::String.is_eq_builtin());
        assert!(Type::Int.nullable().is_nullable());
        assert_eq!(Type::Int.nullable().strip_nullable(), &Type::Int);
    }
}
