use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuiltInType {
    Void,
    Int,
    Byte,
    Bool,
    String,
}

impl BuiltInType {
    pub fn llvm(&self) -> &'static str {
        match self {
            BuiltInType::Void => "void",
            BuiltInType::Int => "i32",
            BuiltInType::Byte => "i8",
            BuiltInType::Bool => "i1",
            BuiltInType::String => "ptr",
        }
    }

    /// Default value stored into a declared scalar, and the fallback return value.
    pub fn zero(&self) -> &'static str {
        match self {
            BuiltInType::Void => "",
            BuiltInType::Int | BuiltInType::Byte => "0",
            BuiltInType::Bool => "false",
            BuiltInType::String => "null",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, BuiltInType::Int | BuiltInType::Byte)
    }

    /// Whether a value of type `self` may be used where `target` is expected.
    /// BYTE widens to INT; everything else must match exactly.
    pub fn promotes_to(&self, target: &Self) -> bool {
        match (self, target) {
            (t1, t2) if t1 == t2 => true,
            (BuiltInType::Byte, BuiltInType::Int) => true,
            _ => false,
        }
    }

    /// Result type of a binary arithmetic operation, or `None` if the operands are not numeric.
    pub fn arithmetic(lhs: Self, rhs: Self) -> Option<Self> {
        match (lhs, rhs) {
            (BuiltInType::Byte, BuiltInType::Byte) => Some(BuiltInType::Byte),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(BuiltInType::Int),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltInType::Void => "VOID",
            BuiltInType::Int => "INT",
            BuiltInType::Byte => "BYTE",
            BuiltInType::Bool => "BOOL",
            BuiltInType::String => "STRING",
        }
    }
}

impl fmt::Display for BuiltInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::BuiltInType::{self, *};

    #[test]
    fn arithmetic_promotion_table() {
        assert_eq!(BuiltInType::arithmetic(Int, Int), Some(Int));
        assert_eq!(BuiltInType::arithmetic(Int, Byte), Some(Int));
        assert_eq!(BuiltInType::arithmetic(Byte, Int), Some(Int));
        assert_eq!(BuiltInType::arithmetic(Byte, Byte), Some(Byte));
        assert_eq!(BuiltInType::arithmetic(Bool, Int), None);
        assert_eq!(BuiltInType::arithmetic(Int, String), None);
        assert_eq!(BuiltInType::arithmetic(Void, Void), None);
    }

    #[test]
    fn promotion_is_one_directional() {
        assert!(Byte.promotes_to(&Int));
        assert!(!Int.promotes_to(&Byte));
        assert!(Bool.promotes_to(&Bool));
        assert!(!Bool.promotes_to(&Int));
    }
}
