//! Instruction-stream opcodes
//!
//! An instruction stream is a flat sequence of `f64` tokens. Tokens at an
//! opcode position hold one of the fixed values below; `NUM` and `VAR` are
//! followed by exactly one argument token (a literal, or a 0-based variable
//! index encoded as a double). Every other opcode stands alone.
//!
//! The value `2` is reserved: it names the "sub-expression" register kind in
//! the builder and never appears as an opcode in a well-formed stream.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumIter, FromRepr, IntoEnumIterator};

/// Opcodes accepted at an opcode position of the stream.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIs, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// Literal constant; the next token is its value.
    Num = 0,
    /// Decision variable; the next token is its 0-based index.
    Var = 1,
    Mul = 3,
    Div = 4,
    Add = 5,
    Sub = 6,
    Square = 7,
    Sqrt = 8,
    Pow = 9,
    /// Exponential function `e^x`.
    Exp = 10,
    /// Natural logarithm.
    Log = 11,
    Sin = 12,
    Cos = 13,
    Tan = 14,
    Min = 15,
    Max = 16,
    Abs = 17,
    Sign = 18,
}

/// Two-operand operators.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIs, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Single-operand functions.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIs, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    Square,
    Sqrt,
    Exp,
    Log,
    Abs,
    Sin,
    Cos,
}

/// How the builder treats an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum OpcodeClass {
    /// `NUM` / `VAR`: consumes one argument token and produces an operand.
    Operand,
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// Recognized but not implemented (`min`, `max`, `tan`, `sign`).
    Unsupported,
}

impl Opcode {
    /// Interpret a token found at an opcode position.
    ///
    /// Returns `None` for non-integral values and values outside the fixed
    /// opcode set (including the reserved register value `2`).
    pub fn from_token(token: f64) -> Option<Self> {
        if !token.is_finite() || token.fract() != 0.0 || !(0.0..=u8::MAX as f64).contains(&token) {
            return None;
        }
        Opcode::from_repr(token as u8)
    }

    /// Encode the opcode back into its token value.
    pub fn to_token(self) -> f64 {
        self as u8 as f64
    }

    /// Whether the opcode is followed by an argument token.
    pub fn takes_argument(self) -> bool {
        matches!(self, Opcode::Num | Opcode::Var)
    }

    /// Operators are every opcode numbered past the reserved register value.
    pub fn is_operator(self) -> bool {
        !self.takes_argument()
    }

    pub fn class(self) -> OpcodeClass {
        match self {
            Opcode::Num | Opcode::Var => OpcodeClass::Operand,
            Opcode::Mul => OpcodeClass::Binary(BinaryOp::Mul),
            Opcode::Div => OpcodeClass::Binary(BinaryOp::Div),
            Opcode::Add => OpcodeClass::Binary(BinaryOp::Add),
            Opcode::Sub => OpcodeClass::Binary(BinaryOp::Sub),
            Opcode::Pow => OpcodeClass::Binary(BinaryOp::Pow),
            Opcode::Square => OpcodeClass::Unary(UnaryOp::Square),
            Opcode::Sqrt => OpcodeClass::Unary(UnaryOp::Sqrt),
            Opcode::Exp => OpcodeClass::Unary(UnaryOp::Exp),
            Opcode::Log => OpcodeClass::Unary(UnaryOp::Log),
            Opcode::Abs => OpcodeClass::Unary(UnaryOp::Abs),
            Opcode::Sin => OpcodeClass::Unary(UnaryOp::Sin),
            Opcode::Cos => OpcodeClass::Unary(UnaryOp::Cos),
            Opcode::Tan | Opcode::Min | Opcode::Max | Opcode::Sign => OpcodeClass::Unsupported,
        }
    }

    /// Convert to string representation.
    pub fn to_str(self) -> &'static str {
        match self {
            Opcode::Num => "num",
            Opcode::Var => "var",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Square => "square",
            Opcode::Sqrt => "sqrt",
            Opcode::Pow => "pow",
            Opcode::Exp => "exp",
            Opcode::Log => "log",
            Opcode::Sin => "sin",
            Opcode::Cos => "cos",
            Opcode::Tan => "tan",
            Opcode::Min => "min",
            Opcode::Max => "max",
            Opcode::Abs => "abs",
            Opcode::Sign => "sign",
        }
    }

    /// Parse from string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        Opcode::iter().find(|op| op.to_str() == s)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    /// Whether swapping the operands changes the result.
    pub fn is_order_sensitive(self) -> bool {
        matches!(self, BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow)
    }
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Square => "square",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Abs => "abs",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
        }
    }

    /// Apply the function to a value.
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnaryOp::Square => value * value,
            UnaryOp::Sqrt => value.sqrt(),
            UnaryOp::Exp => value.exp(),
            UnaryOp::Log => value.ln(),
            UnaryOp::Abs => value.abs(),
            UnaryOp::Sin => value.sin(),
            UnaryOp::Cos => value.cos(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_roundtrip_through_opcodes() {
        for op in Opcode::iter() {
            assert_eq!(Opcode::from_token(op.to_token()), Some(op));
            assert_eq!(Opcode::from_str(op.to_str()), Some(op));
        }
    }

    #[test]
    fn reserved_and_fractional_tokens_are_rejected() {
        assert_eq!(Opcode::from_token(2.0), None);
        assert_eq!(Opcode::from_token(19.0), None);
        assert_eq!(Opcode::from_token(-1.0), None);
        assert_eq!(Opcode::from_token(3.5), None);
        assert_eq!(Opcode::from_token(f64::NAN), None);
    }

    #[test]
    fn unsupported_functions_are_classified() {
        for op in [Opcode::Min, Opcode::Max, Opcode::Tan, Opcode::Sign] {
            assert!(op.class().is_unsupported(), "{op} should be unsupported");
        }
        assert_eq!(Opcode::Pow.class(), OpcodeClass::Binary(BinaryOp::Pow));
        assert_eq!(Opcode::Exp.class(), OpcodeClass::Unary(UnaryOp::Exp));
    }
}
