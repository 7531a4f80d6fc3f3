use std::{cell::RefCell, collections::HashMap};

use crate::{error::PdfResult, filter::decode_stream, stream::Stream, Resolve};

use self::{
    compiler::CompiledProgram, evaluator::PostScriptEvaluator, parser::PostScriptFunctionParser,
};

use super::interval::Interval;

mod compiler;
mod error;
mod evaluator;
mod lexer;
mod parser;

pub use self::error::PostScriptFunctionError;

/// Interpreted results are memoized up to this many distinct inputs, after which new
/// results are no longer cached
pub(crate) const MAX_CACHED_EVALUATIONS: usize = 2048 * 4;

/// A type 4 function (PDF 1.3), also called a PostScript calculator function, shall be
/// represented as a stream containing code written in a small subset of the PostScript language
#[derive(Debug)]
pub struct PostScriptCalculatorFunction {
    domain: Vec<Interval>,
    range: Vec<Interval>,
    program: Program,
}

#[derive(Debug)]
enum Program {
    Compiled(CompiledProgram),
    Interpreted {
        evaluator: PostScriptEvaluator,

        /// Keyed by the bit patterns of the clamped inputs
        cache: RefCell<HashMap<Vec<u32>, Box<[f32]>>>,
    },
}

impl PostScriptCalculatorFunction {
    pub fn from_stream<'a>(
        stream: Stream<'a>,
        domain: &[Interval],
        range: &[Interval],
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let buffer = decode_stream(&stream.stream, &stream.dict, resolver)?;
        let instructions = PostScriptFunctionParser::new(&buffer).parse()?;

        let program = match CompiledProgram::compile(&instructions, domain, range) {
            Some(compiled) => Program::Compiled(compiled),
            None => {
                log::debug!(
                    "PostScript calculator function of {} instructions is not compilable, interpreting",
                    instructions.len()
                );

                Program::Interpreted {
                    evaluator: PostScriptEvaluator::new(instructions),
                    cache: RefCell::new(HashMap::new()),
                }
            }
        };

        Ok(Self {
            domain: domain.to_vec(),
            range: range.to_vec(),
            program,
        })
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.program, Program::Compiled(..))
    }

    /// Inputs are clipped to `/Domain` and outputs to `/Range`
    pub(super) fn eval(&self, src: &[f32], dest: &mut [f32]) -> PdfResult<()> {
        let (evaluator, cache) = match &self.program {
            Program::Compiled(compiled) => {
                compiled.execute(src, dest);
                return Ok(());
            }
            Program::Interpreted { evaluator, cache } => (evaluator, cache),
        };

        let input = self
            .domain
            .iter()
            .zip(src)
            .map(|(domain, &x)| domain.clamp(x))
            .collect::<Vec<f32>>();

        let key = input.iter().map(|x| x.to_bits()).collect::<Vec<u32>>();

        if let Some(cached) = cache.borrow().get(&key) {
            dest[..cached.len()].copy_from_slice(cached);
            return Ok(());
        }

        let stack = evaluator.execute(&input)?;

        let outputs = self.range.len();

        if stack.len() < outputs {
            anyhow::bail!(PostScriptFunctionError::StackUnderflow);
        }

        for ((out, value), range) in dest
            .iter_mut()
            .zip(&stack[stack.len() - outputs..])
            .zip(&self.range)
        {
            *out = range.clamp(value.to_output());
        }

        let mut cache = cache.borrow_mut();

        if cache.len() < MAX_CACHED_EVALUATIONS {
            cache.insert(key, dest[..outputs].into());

            if cache.len() == MAX_CACHED_EVALUATIONS {
                log::debug!("PostScript calculator result cache is full");
            }
        }

        Ok(())
    }

    #[cfg(test)]
    fn cached_evaluations(&self) -> usize {
        match &self.program {
            Program::Compiled(..) => 0,
            Program::Interpreted { cache, .. } => cache.borrow().len(),
        }
    }
}
