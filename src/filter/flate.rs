use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{error::PdfResult, objects::Dictionary, Resolve};

/// <https://www.adobe.com/content/dam/acom/en/devnet/postscript/pdfs/TN5603.Filters.pdf>
#[derive(Debug)]
pub struct FlateDecoderParams {
    /// The default value is 1 (Predictor::Unused)
    predictor: Predictor,

    /// Specifies the number of samples in the sampled row.
    ///
    /// The default value is 1
    columns: u32,

    /// Specifies the number of interleaved color components in a sample.
    ///
    /// The default value is 1
    colors: u32,

    /// The number of bits used to represent each component.
    ///
    /// The default value is 8
    bits_per_component: u32,
}

impl FlateDecoderParams {
    pub fn from_dict<'a>(
        mut dict: Dictionary<'a>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let predictor = dict
            .get::<Predictor>("Predictor", resolver)?
            .unwrap_or(Predictor::Unused);
        let columns = dict.get::<u32>("Columns", resolver)?.unwrap_or(1);
        let colors = dict.get::<u32>("Colors", resolver)?.unwrap_or(1);
        let bits_per_component = dict.get::<u32>("BitsPerComponent", resolver)?.unwrap_or(8);

        Ok(Self {
            predictor,
            columns,
            colors,
            bits_per_component,
        })
    }

    /// Rounded up, since the PNG filters operate on whole bytes
    fn bytes_per_pixel(&self) -> usize {
        ((self.colors * self.bits_per_component + 7) / 8).max(1) as usize
    }

    fn bytes_per_row(&self) -> usize {
        ((self.colors * self.bits_per_component * self.columns + 7) / 8) as usize
    }
}

pdf_enum!(
    int
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Predictor {
        /// No filter is applied *and* no byte precedes each row
        Unused = 1,

        /// TIFF predictor 2
        Tiff = 2,

        /// No filter is applied
        None = 10,

        /// The pixel is subtracted by the pixel to the left of it
        Sub = 11,

        /// The pixel is subtracted by the pixel above it
        Up = 12,

        /// The pixel is subtracted by the average of the pixel to the left and above
        Average = 13,

        /// The pixel is subtracted by the pixel that comes out of a prediction algorithm
        Paeth = 14,

        /// A hybrid of all 4
        Optimum = 15,
    }
);

#[derive(Debug)]
pub struct FlateDecoder {
    params: FlateDecoderParams,
    buffer: Vec<u8>,
}

impl FlateDecoder {
    pub fn new(buffer: &[u8], params: FlateDecoderParams) -> PdfResult<Self> {
        let mut decoder = ZlibDecoder::new(buffer);
        let mut buffer = Vec::new();
        decoder.read_to_end(&mut buffer)?;

        Ok(Self { buffer, params })
    }

    pub fn decode(self) -> PdfResult<Vec<u8>> {
        match self.params.predictor {
            Predictor::Unused => Ok(self.buffer),
            Predictor::Tiff => anyhow::bail!("TIFF predictor is not supported"),
            // every row carries its own PNG filter type, so the declared one is only a hint
            _ => self.decode_png_rows(),
        }
    }

    fn decode_png_rows(self) -> PdfResult<Vec<u8>> {
        let bytes_per_row = self.params.bytes_per_row();
        let bpp = self.params.bytes_per_pixel();

        let mut out = Vec::with_capacity(self.buffer.len());
        let mut previous = vec![0; bytes_per_row];

        for row in self.buffer.chunks(bytes_per_row + 1) {
            let (&filter, data) = match row.split_first() {
                Some(split) => split,
                None => break,
            };

            let mut current = data.to_vec();
            current.resize(bytes_per_row, 0);

            for idx in 0..bytes_per_row {
                let left = if idx >= bpp { current[idx - bpp] } else { 0 };
                let up = previous[idx];
                let up_left = if idx >= bpp { previous[idx - bpp] } else { 0 };

                let predicted = match filter {
                    0 => 0,
                    1 => left,
                    2 => up,
                    3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                    4 => paeth_predictor(left, up, up_left),
                    _ => anyhow::bail!("invalid PNG row filter type {}", filter),
                };

                current[idx] = current[idx].wrapping_add(predicted);
            }

            out.extend_from_slice(&current[..data.len().min(bytes_per_row)]);
            previous = current;
        }

        Ok(out)
    }
}

fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let (a16, b16, c16) = (i16::from(a), i16::from(b), i16::from(c));
    let p = a16 + b16 - c16;
    let pa = (p - a16).abs();
    let pb = (p - b16).abs();
    let pc = (p - c16).abs();

    // order here for ties is important
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
