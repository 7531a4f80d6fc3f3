use crate::{
    error::{ParseError, PdfResult},
    objects::Dictionary,
    Resolve,
};

use super::interval::Interval;

/// Type 2 functions (PDF 1.3) include a set of parameters that define an exponential
/// interpolation of one input value and n output values
#[derive(Debug, Clone)]
pub struct ExponentialInterpolationFunction {
    /// An array of n numbers that shall define the function result when x = 0.0.
    ///
    /// Default value: [0.0]
    c0: Vec<f32>,

    /// `C1 - C0`, precomputed. The array of n numbers that shall define the function
    /// result when x = 1.0 defaults to [1.0]
    delta: Vec<f32>,

    /// The interpolation exponent. Each input value x shall return n values, given by
    /// yj = C0j + xN * (C1j - C0j), for 0 <= j < n
    n: f32,
}

impl ExponentialInterpolationFunction {
    pub fn from_dict<'a>(
        dict: &mut Dictionary<'a>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let c0 = dict
            .get::<Vec<f32>>("C0", resolver)?
            .unwrap_or_else(|| vec![0.0]);
        let c1 = dict
            .get::<Vec<f32>>("C1", resolver)?
            .unwrap_or_else(|| vec![1.0]);
        let n = dict.expect_number("N", resolver)?;

        if c0.len() != c1.len() {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "/C0 and /C1 differ in length ({} and {})",
                c0.len(),
                c1.len()
            )));
        }

        let delta = c0.iter().zip(&c1).map(|(c0, c1)| c1 - c0).collect();

        Ok(Self { c0, delta, n })
    }

    pub fn output_size(&self) -> usize {
        self.c0.len()
    }

    pub(super) fn eval(&self, domain: Interval, x: f32, dest: &mut [f32]) {
        let x = domain.clamp(x);

        let t = if self.n == 1.0 { x } else { x.powf(self.n) };

        for ((out, c0), delta) in dest.iter_mut().zip(&self.c0).zip(&self.delta) {
            *out = c0 + t * delta;
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{objects::Object, resolve::ObjectTable};

    use super::*;

    fn build(c0: &[f32], c1: &[f32], n: f32) -> ExponentialInterpolationFunction {
        let mut table = ObjectTable::new();
        let mut dict = Dictionary::empty()
            .with("C0", Object::number_array(c0))
            .with("C1", Object::number_array(c1))
            .with("N", Object::Real(n));

        ExponentialInterpolationFunction::from_dict(&mut dict, &mut table).unwrap()
    }

    #[test]
    fn linear_is_exact() {
        let c0 = [0.1, 0.7, 0.0];
        let c1 = [0.9, 0.2, 1.0];
        let f = build(&c0, &c1, 1.0);

        for i in 0..=100 {
            let x = i as f32 / 100.0;
            let mut out = [0.0; 3];

            f.eval(Interval::UNIT, x, &mut out);

            for j in 0..3 {
                assert_eq!(out[j], c0[j] + x * (c1[j] - c0[j]));
            }
        }
    }

    #[test]
    fn quadratic() {
        let f = build(&[0.0], &[1.0], 2.0);
        let mut out = [0.0];

        f.eval(Interval::UNIT, 0.5, &mut out);

        assert_eq!(out, [0.25]);
    }

    #[test]
    fn input_is_clipped_to_domain() {
        let f = build(&[0.0], &[1.0], 1.0);
        let mut out = [0.0];

        f.eval(Interval::UNIT, 3.0, &mut out);

        assert_eq!(out, [1.0]);
    }

    #[test]
    fn defaults() {
        let mut table = ObjectTable::new();
        let mut dict = Dictionary::empty().with("N", Object::Integer(1));

        let f = ExponentialInterpolationFunction::from_dict(&mut dict, &mut table).unwrap();
        let mut out = [0.0];
        f.eval(Interval::UNIT, 0.75, &mut out);

        assert_eq!(f.output_size(), 1);
        assert_eq!(out, [0.75]);
    }

    #[test]
    fn mismatched_lengths() {
        let mut table = ObjectTable::new();
        let mut dict = Dictionary::empty()
            .with("C0", Object::number_array(&[0.0, 0.0]))
            .with("N", Object::Integer(1));

        assert!(ExponentialInterpolationFunction::from_dict(&mut dict, &mut table).is_err());
    }
}
