use std::fmt;

pub(crate) type PostScriptFunctionResult<T> = Result<T, PostScriptFunctionError>;

#[derive(Debug, Clone, PartialEq)]
pub enum PostScriptFunctionError {
    /// Operand stack overflow
    StackOverflow,

    /// Operand stack underflow
    StackUnderflow,

    /// Operand of wrong type
    TypeCheck,

    /// Operand out of bounds
    RangeCheck,

    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    UnexpectedEof,

    UnknownOperator(String),

    InvalidNumber(String),

    UnexpectedByte(u8),
}

impl fmt::Display for PostScriptFunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "PostScript function stack overflow"),
            Self::StackUnderflow => write!(f, "PostScript function stack underflow"),
            Self::TypeCheck => write!(f, "PostScript function operand of wrong type"),
            Self::RangeCheck => write!(f, "PostScript function operand out of bounds"),
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {} in PostScript function, found {}", expected, found)
            }
            Self::UnexpectedEof => write!(f, "unexpected end of PostScript function"),
            Self::UnknownOperator(op) => write!(f, "unknown PostScript operator {:?}", op),
            Self::InvalidNumber(n) => write!(f, "invalid number {:?} in PostScript function", n),
            Self::UnexpectedByte(b) => {
                write!(f, "unexpected byte {:?} in PostScript function", *b as char)
            }
        }
    }
}

impl std::error::Error for PostScriptFunctionError {}
