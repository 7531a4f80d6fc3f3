use std::rc::Rc;

use crate::{
    error::{ParseError, PdfResult},
    objects::Dictionary,
    Resolve,
};

use super::{interval::Interval, Function, FunctionFactory};

/// Type 3 functions (PDF 1.3) define a stitching of the subdomains of several 1-input functions to
/// produce a single new 1-input function. Since the resulting stitching function is a 1-input function,
/// the domain is given by a twoelement array, [Domain0 Domain1].
#[derive(Debug, Clone)]
pub struct StitchingFunction {
    /// An array of k 1-input functions that shall make up the stitching function. The output
    /// dimensionality of all functions shall be the same, and compatible with the value of Range if Range
    /// is present
    functions: Vec<Rc<Function>>,

    /// An array of k - 1 numbers that, in combination with Domain, shall define the intervals to which
    /// each function from the Functions array shall apply. Bounds elements shall be in order of
    /// increasing value, and each value shall be within the domain defined by Domain
    bounds: Vec<f32>,

    /// An array of 2 * k numbers that, taken in pairs, shall map each subset of the domain defined by
    /// Domain and the Bounds array to the domain of the corresponding function
    encode: Vec<Interval>,
}

impl StitchingFunction {
    pub fn from_dict<'a>(
        dict: &mut Dictionary<'a>,
        domain: &[Interval],
        factory: &mut FunctionFactory,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        if domain.len() != 1 {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "stitching functions take exactly 1 input, found a /Domain of {}",
                domain.len()
            )));
        }

        let functions = dict
            .expect_arr("Functions", resolver)?
            .into_iter()
            .map(|obj| factory.create(obj, resolver))
            .collect::<PdfResult<Vec<Rc<Function>>>>()?;

        let bounds = dict.expect::<Vec<f32>>("Bounds", resolver)?;
        let encode = Interval::pairs(&dict.expect::<Vec<f32>>("Encode", resolver)?, "Encode")?;

        let k = functions.len();

        if k == 0 {
            anyhow::bail!(ParseError::InvalidFunction(
                "/Functions must not be empty".to_owned()
            ));
        }

        if bounds.len() != k - 1 {
            anyhow::bail!(ParseError::ArrayOfInvalidLength {
                expected: k - 1,
                found: bounds.len(),
            });
        }

        if encode.len() != k {
            anyhow::bail!(ParseError::ArrayOfInvalidLength {
                expected: k * 2,
                found: encode.len() * 2,
            });
        }

        if bounds.windows(2).any(|w| w[0] > w[1]) {
            anyhow::bail!(ParseError::InvalidFunction(
                "/Bounds must be in increasing order".to_owned()
            ));
        }

        let output_size = functions[0].output_size();

        if let Some(f) = functions
            .iter()
            .find(|f| f.input_size() != 1 || f.output_size() != output_size)
        {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "stitched functions must be 1-in, {}-out; found {}-in, {}-out",
                output_size,
                f.input_size(),
                f.output_size()
            )));
        }

        Ok(Self {
            functions,
            bounds,
            encode,
        })
    }

    pub fn output_size(&self) -> usize {
        self.functions[0].output_size()
    }

    pub(super) fn eval(&self, domain: Interval, x: f32, dest: &mut [f32]) -> PdfResult<()> {
        let v = domain.clamp(x);

        let i = self
            .bounds
            .iter()
            .position(|&bound| v < bound)
            .unwrap_or(self.bounds.len());

        let dmin = if i == 0 { domain.min } else { self.bounds[i - 1] };
        let dmax = self.bounds.get(i).copied().unwrap_or(domain.max);

        let encode = self.encode[i];

        // a partition can collapse to a single point when bounds coincide with each other
        // or with the edge of the domain
        let remapped = if dmin == dmax {
            encode.min
        } else {
            Interval::interpolate(v, Interval::new(dmin, dmax), encode)
        };

        self.functions[i].eval(&[remapped], dest)
    }
}
