use crate::error::PdfResult;

fn hex_digit(c: u8) -> PdfResult<u8> {
    Ok(match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => anyhow::bail!("invalid character {:?} in ASCIIHexDecode stream", c as char),
    })
}

/// A trailing odd digit behaves as if it were followed by `0`
pub(crate) fn decode_ascii_hex(stream: &[u8]) -> PdfResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(stream.len() / 2);

    let mut iter = stream
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .take_while(|&b| b != b'>');

    while let Some(high) = iter.next() {
        let high = hex_digit(high)?;
        let low = iter.next().map(hex_digit).transpose()?.unwrap_or(0);

        buffer.push(high * 16 + low);
    }

    Ok(buffer)
}

pub(crate) fn decode_ascii_85(mut stream: &[u8]) -> PdfResult<Vec<u8>> {
    if stream.starts_with(b"<~") {
        stream = &stream[2..];
    }

    let mut buffer = Vec::with_capacity((stream.len() / 5) * 4);

    let mut iter = stream.iter().copied().filter(|b| !b.is_ascii_whitespace());

    let mut n: u32 = 0;
    let mut count = 0;

    while let Some(digit) = iter.next() {
        match digit {
            b'~' => {
                if iter.next() != Some(b'>') {
                    anyhow::bail!("malformed end of data marker in ASCII85Decode stream");
                }

                break;
            }
            b'z' if count == 0 => buffer.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                n = n.wrapping_mul(85).wrapping_add(u32::from(digit - b'!'));
                count += 1;

                if count == 5 {
                    buffer.extend_from_slice(&n.to_be_bytes());
                    count = 0;
                    n = 0;
                }
            }
            _ => anyhow::bail!(
                "invalid character {:?} in ASCII85Decode stream",
                digit as char
            ),
        }
    }

    if count == 1 {
        anyhow::bail!("ASCII85Decode stream ends with a single character group");
    }

    if count != 0 {
        let to_keep = count - 1;

        while count != 5 {
            n = n.wrapping_mul(85).wrapping_add(84);
            count += 1;
        }

        buffer.extend_from_slice(&n.to_be_bytes()[..to_keep]);
    }

    Ok(buffer)
}

#[cfg(test)]
mod test {
    use super::{decode_ascii_85, decode_ascii_hex};

    #[test]
    fn ascii_hex() {
        assert_eq!(decode_ascii_hex(b"00 ff 7F>").unwrap(), [0x00, 0xff, 0x7f]);
        assert_eq!(decode_ascii_hex(b"7").unwrap(), [0x70]);
        assert!(decode_ascii_hex(b"zz").is_err());
    }

    #[test]
    fn ascii_85() {
        assert_eq!(
            decode_ascii_85(b"<~9jqo^F*2M7/c~>").unwrap(),
            [77, 97, 110, 32, 115, 117, 114, 101, 46],
        );

        assert_eq!(decode_ascii_85(b"z~>").unwrap(), [0, 0, 0, 0]);
    }
}
