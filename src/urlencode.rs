/*
 * urlencode.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Mostra, an embeddable HTTP/1.x server library.
 *
 * Mostra is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Mostra is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Mostra.  If not, see <http://www.gnu.org/licenses/>.
 */

//! URL percent-encoding. The encoder rides on the `percent-encoding` crate;
//! the decoder is hand-written because it must treat `+` as space and fail
//! on incomplete or non-hex `%` sequences, which the crate's lenient decoder
//! does not.

use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::Error;

/// Everything outside `[A-Za-z0-9-_.~]` is percent-encoded.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How the encoder spells a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceEncoding {
    /// Space becomes `+` (HTML form convention).
    Plus,
    /// Space becomes `%20`.
    Percent,
}

/// Percent-encode `data`. Unreserved bytes (`[A-Za-z0-9-_.~]`) pass through,
/// spaces follow `space`, everything else becomes `%HH` with uppercase hex.
/// Never fails.
pub fn url_encode(data: &[u8], space: SpaceEncoding) -> String {
    let encoded = percent_encode(data, URL_ENCODE_SET).to_string();
    match space {
        // A literal "%20" in the input encodes as "%2520", so every "%20"
        // here is an encoded space.
        SpaceEncoding::Plus => encoded.replace("%20", "+"),
        SpaceEncoding::Percent => encoded,
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode a percent-encoded string to raw bytes. `%HH` consumes two hex
/// digits of either case, `+` decodes to space, everything else passes
/// through.
pub fn url_decode(encoded: &str) -> Result<Vec<u8>, Error> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err(Error::UrlDecode(
                        "incomplete URL-encoded sequence".to_string(),
                    ));
                }
                let high = hex_value(bytes[i + 1]);
                let low = hex_value(bytes[i + 2]);
                match (high, low) {
                    (Some(high), Some(low)) => decoded.push((high << 4) | low),
                    _ => {
                        return Err(Error::UrlDecode(
                            "invalid URL-encoded sequence".to_string(),
                        ))
                    }
                }
                i += 3;
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }
    Ok(decoded)
}

/// Decode to a UTF-8 string. Used by the request parser for path segments
/// and query arguments.
pub fn url_decode_utf8(encoded: &str) -> Result<String, Error> {
    String::from_utf8(url_decode(encoded)?)
        .map_err(|_| Error::UrlDecode("URL-encoded data is not valid UTF-8".to_string()))
}
