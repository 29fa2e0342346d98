use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Bytes written as-is; everything else becomes `%XX`.
fn is_unescaped(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/')
}

/// Percent-encode an entry path for use inside a locator.
///
/// `!` and `%` are always escaped, so the result never contains the
/// `!/` separator.
pub fn encode_path(name: &[u8]) -> String {
    let mut out = String::with_capacity(name.len());
    for &byte in name {
        if is_unescaped(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
            out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
        }
    }
    out
}

/// Decode a percent-encoded entry path back into raw name bytes.
///
/// Characters that were not escaped contribute their UTF-8 bytes, so
/// names written by other encoders that leave more characters bare
/// still decode.
pub fn decode_path(encoded: &str) -> Result<Vec<u8>> {
    let bytes = encoded.as_bytes();
    if !bytes.contains(&b'%') {
        return Ok(bytes.to_vec());
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3).ok_or_else(|| {
                Error::locator(
                    encoded,
                    format!("truncated escape sequence {:?}", &encoded[i..]),
                )
            })?;
            match (hex_value(escape[0]), hex_value(escape[1])) {
                (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                _ => {
                    return Err(Error::locator(
                        encoded,
                        format!(
                            "invalid escape sequence {:?}",
                            String::from_utf8_lossy(&bytes[i..i + 3])
                        ),
                    ));
                }
            }
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|v| v as u8)
}
