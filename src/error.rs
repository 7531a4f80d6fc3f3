use std::fmt;

use crate::objects::ObjectType;

pub type PdfResult<T> = anyhow::Result<T>;

#[derive(Debug)]
pub enum ParseError {
    UnexpectedEof,
    MismatchedObjectType {
        expected: ObjectType,
        found: String,
    },
    MismatchedObjectTypeAny {
        expected: &'static [ObjectType],
        found: String,
    },
    MissingRequiredKey {
        key: &'static str,
    },
    ArrayOfInvalidLength {
        expected: usize,
        found: usize,
    },
    UnrecognizedVariant {
        found: String,
        ty: &'static str,
    },
    /// The dictionary was well-typed, but describes a function that can't exist,
    /// e.g. an inverted domain or a stitching function with a multi-dimensional input
    InvalidFunction(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::MismatchedObjectType { expected, found } => {
                write!(f, "expected {:?}, found {}", expected, found)
            }
            Self::MismatchedObjectTypeAny { expected, found } => {
                write!(f, "expected one of {:?}, found {}", expected, found)
            }
            Self::MissingRequiredKey { key } => write!(f, "missing required key /{}", key),
            Self::ArrayOfInvalidLength { expected, found } => {
                write!(f, "expected array of length {}, found {}", expected, found)
            }
            Self::UnrecognizedVariant { found, ty } => {
                write!(f, "unrecognized variant {:?} for {}", found, ty)
            }
            Self::InvalidFunction(reason) => write!(f, "invalid function: {}", reason),
        }
    }
}

impl std::error::Error for ParseError {}
