use std::borrow::Cow;

use crate::{error::PdfResult, objects::Dictionary, stream::StreamDict, Resolve};

use flate::{FlateDecoder, FlateDecoderParams};

pub mod ascii;
pub mod flate;

pub(crate) fn decode_stream<'b, 'a>(
    stream: &'b [u8],
    stream_dict: &StreamDict<'a>,
    resolver: &mut dyn Resolve<'a>,
) -> PdfResult<Cow<'b, [u8]>> {
    let filters = match &stream_dict.filter {
        Some(filters) if !filters.is_empty() => filters,
        _ => return Ok(Cow::Borrowed(stream)),
    };

    let mut stream = stream.to_vec();

    for (idx, filter) in filters.iter().enumerate() {
        let decode_params = stream_dict
            .decode_parms
            .as_ref()
            .and_then(|params| params.get(idx).cloned())
            .unwrap_or_else(Dictionary::empty);

        stream = match filter {
            FilterKind::AsciiHex => ascii::decode_ascii_hex(&stream)?,
            FilterKind::Ascii85 => ascii::decode_ascii_85(&stream)?,
            FilterKind::Flate => {
                let decoder_params = FlateDecoderParams::from_dict(decode_params, resolver)?;

                FlateDecoder::new(&stream, decoder_params)?.decode()?
            }
            other => {
                log::warn!("unsupported filter {:?} in function stream", other);
                anyhow::bail!("unsupported stream filter {:?}", other)
            }
        };
    }

    Ok(Cow::Owned(stream))
}

pdf_enum!(
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FilterKind {
        /// Decodes data encoded in an ASCII hexadecimal representation, reproducing
        /// the original binary data
        AsciiHex = "ASCIIHexDecode",

        /// Decodes data encoded in an ASCII base-85 representation, reproducing the
        /// original binary data
        Ascii85 = "ASCII85Decode",

        /// Decompresses data encoded using the LZW (Lempel-ZivWelch) adaptive compression
        /// method, reproducing the original text or binary data
        Lzw = "LZWDecode",

        /// Decompresses data encoded using the zlib/deflate compression method,
        /// reproducing the original text or binary data
        Flate = "FlateDecode",

        /// Decompresses data encoded using a byte-oriented run-length encoding algorithm
        RunLength = "RunLengthDecode",

        /// Decrypts data encrypted by a security handler, reproducing the data as it
        /// was before encryption
        Crypt = "Crypt",
    }
);
