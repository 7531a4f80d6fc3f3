use bitvec::prelude::*;

use crate::{
    error::{ParseError, PdfResult},
    filter::decode_stream,
    stream::Stream,
    Resolve,
};

use super::interval::Interval;

/// Inputs up to this dimensionality interpolate without touching the heap
const MAX_STACK_INPUTS: usize = 8;
const MAX_STACK_VERTICES: usize = 1 << MAX_STACK_INPUTS;

const MAX_INPUTS: usize = 16;

/// Type 0 functions use a sequence of sample values (contained in a stream) to provide an
/// approximation for functions whose domains and ranges are bounded. The samples are organized
/// as an m-dimensional table in which each entry has n components.
#[derive(Debug, Clone)]
pub struct SampledFunction {
    /// An array of m positive integers that shall specify the number of samples in each
    /// input dimension of the sample table
    size: Vec<usize>,

    /// An array of 2 * m numbers specifying the linear mapping of input values into the domain
    /// of the function's sample table.
    ///
    /// Default value: [0 (Size0 - 1) 0 (Size1 - 1) ...]
    encode: Vec<Interval>,

    /// An array of 2 * n numbers specifying the linear mapping of sample values into the range
    /// appropriate for the function's output values
    ///
    /// Default value: same as the value of Range
    decode: Vec<Interval>,

    /// Every sample, normalized to `[0, 1]`. The first dimension varies fastest, and the
    /// n components of each entry are stored contiguously
    samples: Vec<f32>,
}

pdf_enum!(
    int
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BitsPerSample {
        One = 1,
        Two = 2,
        Four = 4,
        Eight = 8,
        Twelve = 12,
        Sixteen = 16,
        TwentyFour = 24,
        ThirtyTwo = 32,
    }
);

pdf_enum!(
    int
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum InterpolationOrder {
        #[default]
        Linear = 1,
        Cubic = 3,
    }
);

impl SampledFunction {
    pub fn from_stream<'a>(
        mut stream: Stream<'a>,
        domain: &[Interval],
        range: &[Interval],
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let dict = &mut stream.dict.other;

        let size = dict.expect::<Vec<usize>>("Size", resolver)?;
        let bits_per_sample = dict.expect::<BitsPerSample>("BitsPerSample", resolver)?;

        match dict.get_integer("Order", resolver)? {
            None => {}
            Some(order) => match InterpolationOrder::from_integer(order) {
                Ok(InterpolationOrder::Linear) => {}
                Ok(InterpolationOrder::Cubic) => {
                    log::warn!("cubic spline interpolation is unsupported, falling back to linear")
                }
                Err(..) => log::warn!("unknown interpolation order {}, using linear", order),
            },
        }

        let encode = match dict.get::<Vec<f32>>("Encode", resolver)? {
            Some(encode) => Interval::pairs(&encode, "Encode")?,
            None => size
                .iter()
                .map(|&s| Interval::new(0.0, s.saturating_sub(1) as f32))
                .collect(),
        };

        let decode = match dict.get::<Vec<f32>>("Decode", resolver)? {
            Some(decode) => Interval::pairs(&decode, "Decode")?,
            None => range.to_vec(),
        };

        if size.len() != domain.len() {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "/Size has {} entries for a {}-input function",
                size.len(),
                domain.len()
            )));
        }

        if size.len() > MAX_INPUTS {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "sampled functions support at most {} inputs, found {}",
                MAX_INPUTS,
                size.len()
            )));
        }

        if size.iter().any(|&s| s == 0) {
            anyhow::bail!(ParseError::InvalidFunction(
                "/Size entries must be positive".to_owned()
            ));
        }

        if encode.len() != size.len() {
            anyhow::bail!(ParseError::ArrayOfInvalidLength {
                expected: size.len() * 2,
                found: encode.len() * 2,
            });
        }

        if decode.len() != range.len() {
            anyhow::bail!(ParseError::ArrayOfInvalidLength {
                expected: range.len() * 2,
                found: decode.len() * 2,
            });
        }

        if domain.iter().any(|d| d.is_degenerate()) {
            anyhow::bail!(ParseError::InvalidFunction(
                "sampled functions may not have an empty /Domain interval".to_owned()
            ));
        }

        let sample_count = size
            .iter()
            .try_fold(range.len(), |acc, &s| acc.checked_mul(s))
            .ok_or_else(|| anyhow::anyhow!("sample table is too large"))?;

        let data = decode_stream(&stream.stream, &stream.dict, resolver)?;
        let samples = unpack_samples(&data, bits_per_sample as usize, sample_count)?;

        Ok(Self {
            size,
            encode,
            decode,
            samples,
        })
    }

    pub(super) fn eval(
        &self,
        domain: &[Interval],
        range: &[Interval],
        src: &[f32],
        dest: &mut [f32],
    ) {
        let vertices = 1 << self.size.len();

        if self.size.len() <= MAX_STACK_INPUTS {
            let mut weights = [1.0; MAX_STACK_VERTICES];
            let mut offsets = [0; MAX_STACK_VERTICES];

            self.interpolate(
                domain,
                range,
                src,
                dest,
                &mut weights[..vertices],
                &mut offsets[..vertices],
            );
        } else {
            self.interpolate(
                domain,
                range,
                src,
                dest,
                &mut vec![1.0; vertices],
                &mut vec![0; vertices],
            );
        }
    }

    /// Multilinear interpolation between the 2^m samples surrounding the input.
    ///
    /// `weights` must be filled with 1 and `offsets` with 0 on entry.
    fn interpolate(
        &self,
        domain: &[Interval],
        range: &[Interval],
        src: &[f32],
        dest: &mut [f32],
        weights: &mut [f32],
        offsets: &mut [usize],
    ) {
        let output_size = self.decode.len();

        // distance in `samples` between neighbours along the current dimension
        let mut stride = output_size;

        for (i, ((&x, &size), (&domain, &encode))) in src
            .iter()
            .zip(&self.size)
            .zip(domain.iter().zip(&self.encode))
            .enumerate()
        {
            let x = domain.clamp(x);
            let e = Interval::new(0.0, (size - 1) as f32)
                .clamp(Interval::interpolate(x, domain, encode));

            let e0 = if size == 1 {
                0
            } else if e < (size - 1) as f32 {
                e.floor() as usize
            } else {
                size - 2
            };

            let (w0, w1) = if size == 1 {
                (1.0, 0.0)
            } else {
                (e0 as f32 + 1.0 - e, e - e0 as f32)
            };

            let offset0 = e0 * stride;
            let offset1 = if size == 1 { offset0 } else { offset0 + stride };

            let bit = 1 << i;

            for (j, (weight, offset)) in weights.iter_mut().zip(offsets.iter_mut()).enumerate() {
                if j & bit != 0 {
                    *weight *= w1;
                    *offset += offset1;
                } else {
                    *weight *= w0;
                    *offset += offset0;
                }
            }

            stride *= size;
        }

        for (j, (out, (&decode, &range))) in dest
            .iter_mut()
            .zip(self.decode.iter().zip(range))
            .enumerate()
        {
            let sum = weights
                .iter()
                .zip(offsets.iter())
                .map(|(&weight, &offset)| self.samples[offset + j] * weight)
                .sum::<f32>();

            *out = range.clamp(Interval::interpolate(sum, Interval::UNIT, decode));
        }
    }
}

/// Splits a big-endian bitstream into `count` samples of `bits_per_sample` bits each,
/// normalized to `[0, 1]`. A short stream is padded with zeros.
fn unpack_samples(data: &[u8], bits_per_sample: usize, count: usize) -> PdfResult<Vec<f32>> {
    let needed = count
        .checked_mul(bits_per_sample)
        .map(|bits| (bits + 7) / 8)
        .ok_or_else(|| anyhow::anyhow!("sample table is too large"))?;

    let mut bytes = data[..needed.min(data.len())].to_vec();

    if bytes.len() < needed {
        log::warn!(
            "sample table is {} bytes, expected {}; padding with zeros",
            bytes.len(),
            needed
        );
        bytes.resize(needed, 0);
    }

    let scale = 1.0 / ((1u64 << bits_per_sample) - 1) as f64;

    Ok(bytes
        .view_bits::<Msb0>()
        .chunks_exact(bits_per_sample)
        .take(count)
        .map(|sample| (f64::from(sample.load_be::<u32>()) * scale) as f32)
        .collect())
}

#[cfg(test)]
mod test {
    use crate::{
        objects::{Dictionary, Object},
        resolve::ObjectTable,
    };

    use super::*;

    fn build(
        domain: &[Interval],
        range: &[Interval],
        dict: Dictionary<'static>,
        data: Vec<u8>,
    ) -> PdfResult<SampledFunction> {
        let mut table = ObjectTable::new();
        let stream = Stream::new(dict, data, &mut table)?;

        SampledFunction::from_stream(stream, domain, range, &mut table)
    }

    fn eval(f: &SampledFunction, domain: &[Interval], range: &[Interval], x: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; range.len()];
        f.eval(domain, range, x, &mut out);
        out
    }

    #[test]
    fn one_dimensional_linear() {
        let domain = [Interval::UNIT];
        let range = [Interval::UNIT];
        let dict = Dictionary::empty()
            .with("Size", Object::integer_array(&[2]))
            .with("BitsPerSample", Object::Integer(8));

        let f = build(&domain, &range, dict, vec![0, 255]).unwrap();

        assert_eq!(eval(&f, &domain, &range, &[0.0]), [0.0]);
        assert_eq!(eval(&f, &domain, &range, &[1.0]), [1.0]);
        assert!((eval(&f, &domain, &range, &[0.5])[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bilinear_with_two_outputs() {
        let domain = [Interval::UNIT, Interval::UNIT];
        let range = [Interval::UNIT, Interval::UNIT];
        let dict = Dictionary::empty()
            .with("Size", Object::integer_array(&[2, 2]))
            .with("BitsPerSample", Object::Integer(8));

        // (x0, x1) -> (x0 corner value, x1 corner value)
        let data = vec![0, 0, 255, 0, 0, 255, 255, 255];
        let f = build(&domain, &range, dict, data).unwrap();

        let out = eval(&f, &domain, &range, &[0.25, 0.75]);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!((out[1] - 0.75).abs() < 1e-6);

        assert_eq!(eval(&f, &domain, &range, &[1.0, 0.0]), [1.0, 0.0]);
    }

    #[test]
    fn decode_and_encode_are_applied() {
        let domain = [Interval::UNIT];
        let range = [Interval::new(0.0, 10.0)];
        let dict = Dictionary::empty()
            .with("Size", Object::integer_array(&[3]))
            .with("BitsPerSample", Object::Integer(4))
            .with("Encode", Object::number_array(&[2.0, 0.0]))
            .with("Decode", Object::number_array(&[0.0, 10.0]));

        // samples 0x0, 0xf, 0x5
        let f = build(&domain, &range, dict, vec![0x0f, 0x50]).unwrap();

        assert!((eval(&f, &domain, &range, &[0.0])[0] - 10.0 / 3.0).abs() < 1e-5);
        assert_eq!(eval(&f, &domain, &range, &[0.5]), [10.0]);
        assert_eq!(eval(&f, &domain, &range, &[1.0]), [0.0]);
    }

    #[test]
    fn single_sample_dimension() {
        let domain = [Interval::UNIT];
        let range = [Interval::UNIT];
        let dict = Dictionary::empty()
            .with("Size", Object::integer_array(&[1]))
            .with("BitsPerSample", Object::Integer(8));

        let f = build(&domain, &range, dict, vec![51]).unwrap();

        assert_eq!(eval(&f, &domain, &range, &[0.7]), [0.2]);
    }

    #[test]
    fn cubic_order_falls_back_to_linear() {
        let domain = [Interval::UNIT];
        let range = [Interval::UNIT];
        let dict = Dictionary::empty()
            .with("Size", Object::integer_array(&[2]))
            .with("BitsPerSample", Object::Integer(8))
            .with("Order", Object::Integer(3));

        let f = build(&domain, &range, dict, vec![0, 255]).unwrap();

        assert!((eval(&f, &domain, &range, &[0.5])[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn short_stream_is_padded() {
        let domain = [Interval::UNIT];
        let range = [Interval::UNIT];
        let dict = Dictionary::empty()
            .with("Size", Object::integer_array(&[2]))
            .with("BitsPerSample", Object::Integer(16));

        let f = build(&domain, &range, dict, vec![0xff, 0xff]).unwrap();

        assert_eq!(eval(&f, &domain, &range, &[0.0]), [1.0]);
        assert_eq!(eval(&f, &domain, &range, &[1.0]), [0.0]);
    }

    #[test]
    fn rejects_bad_dictionaries() {
        let domain = [Interval::UNIT];
        let range = [Interval::UNIT];

        let bad_bps = Dictionary::empty()
            .with("Size", Object::integer_array(&[2]))
            .with("BitsPerSample", Object::Integer(7));
        assert!(build(&domain, &range, bad_bps, vec![0, 0]).is_err());

        let wrong_arity = Dictionary::empty()
            .with("Size", Object::integer_array(&[2, 2]))
            .with("BitsPerSample", Object::Integer(8));
        assert!(build(&domain, &range, wrong_arity, vec![0; 4]).is_err());

        let missing_size = Dictionary::empty().with("BitsPerSample", Object::Integer(8));
        assert!(build(&domain, &range, missing_size, vec![0; 2]).is_err());

        let long_encode = Dictionary::empty()
            .with("Size", Object::integer_array(&[2]))
            .with("BitsPerSample", Object::Integer(8))
            .with("Encode", Object::number_array(&[0.0, 1.0, 0.0, 1.0]));
        assert!(build(&domain, &range, long_encode, vec![0, 255]).is_err());

        let point = [Interval::new(0.5, 0.5)];
        let degenerate_domain = Dictionary::empty()
            .with("Size", Object::integer_array(&[2]))
            .with("BitsPerSample", Object::Integer(8));
        assert!(build(&point, &range, degenerate_domain, vec![0, 255]).is_err());
    }

    #[test]
    fn unpacks_sub_byte_and_wide_samples() {
        assert_eq!(
            unpack_samples(&[0b1011_0001], 2, 4).unwrap(),
            [2.0 / 3.0, 1.0, 0.0, 1.0 / 3.0]
        );
        assert!((unpack_samples(&[0xab, 0xc0], 12, 1).unwrap()[0] - 2748.0 / 4095.0).abs() < 1e-6);
        assert_eq!(unpack_samples(&[0xff; 4], 32, 1).unwrap(), [1.0]);
    }
}
