//! Evaluation of PDF function objects (ISO 32000-1 §7.10): sampled, exponential
//! interpolation, stitching, and PostScript calculator functions.

pub use crate::{
    error::{ParseError, PdfResult},
    function::{
        Function, FunctionFactory, Interval, ParsedFunction, PostScriptFunctionError,
        PredefinedSpotFunction, SpotFunction, TransferFunction,
    },
    objects::{Dictionary, Object, ObjectType, Reference},
    resolve::{FromObj, ObjectTable, Resolve},
    stream::Stream,
};

#[macro_use]
mod macros;

mod error;
mod filter;
mod function;
mod objects;
mod resolve;
mod stream;
