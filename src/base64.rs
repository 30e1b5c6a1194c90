/*
 * base64.rs
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

//! Base64 helper over the `base64` crate: standard and URL-safe alphabets,
//! padded output, decode failures mapped into [`Error::Base64Decode`].

use ::base64::alphabet;
use ::base64::engine::general_purpose::GeneralPurpose;
use ::base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use ::base64::Engine;

use crate::error::Error;

/// Encoding dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// `A-Za-z0-9+/`
    Standard,
    /// `A-Za-z0-9-_`
    UrlSafe,
}

const STRICT: GeneralPurposeConfig = GeneralPurposeConfig::new();
const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

static STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, STRICT);
static STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
static URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, STRICT);
static URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

fn engine(dict: Alphabet, ignore_padding: bool) -> &'static GeneralPurpose {
    match (dict, ignore_padding) {
        (Alphabet::Standard, false) => &STANDARD,
        (Alphabet::Standard, true) => &STANDARD_LENIENT,
        (Alphabet::UrlSafe, false) => &URL_SAFE,
        (Alphabet::UrlSafe, true) => &URL_SAFE_LENIENT,
    }
}

/// Encode with `=` padding. Never fails.
pub fn encode(data: &[u8], dict: Alphabet) -> String {
    engine(dict, false).encode(data)
}

/// Decode. Padding is required unless `ignore_padding`; characters outside
/// the dictionary fail.
pub fn decode(encoded: &str, dict: Alphabet, ignore_padding: bool) -> Result<Vec<u8>, Error> {
    engine(dict, ignore_padding)
        .decode(encoded)
        .map_err(|e| Error::Base64Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_vectors() {
        assert_eq!(encode(b"", Alphabet::Standard), "");
        assert_eq!(encode(b"f", Alphabet::Standard), "Zg==");
        assert_eq!(encode(b"fo", Alphabet::Standard), "Zm8=");
        assert_eq!(encode(b"foo", Alphabet::Standard), "Zm9v");
        assert_eq!(encode(b"foobar", Alphabet::Standard), "Zm9vYmFy");
    }

    #[test]
    fn url_safe_dictionary() {
        // 0xFB 0xEF is +/ in the standard dictionary
        assert_eq!(encode(&[0xFB, 0xEF], Alphabet::Standard), "++8=");
        assert_eq!(encode(&[0xFB, 0xEF], Alphabet::UrlSafe), "--8=");
    }

    #[test]
    fn decode_round_trip() {
        let data: Vec<u8> = (0u8..=255).collect();
        for dict in [Alphabet::Standard, Alphabet::UrlSafe] {
            let encoded = encode(&data, dict);
            assert_eq!(decode(&encoded, dict, false).unwrap(), data);
        }
    }

    #[test]
    fn decode_missing_padding() {
        assert!(decode("Zg", Alphabet::Standard, false).is_err());
        assert_eq!(decode("Zg", Alphabet::Standard, true).unwrap(), b"f");
    }

    #[test]
    fn decode_character_outside_dictionary() {
        let err = decode("Zm9*", Alphabet::Standard, false).unwrap_err();
        assert!(matches!(err, Error::Base64Decode(_)));
        // URL-safe input is invalid for the standard dictionary
        assert!(decode("--8=", Alphabet::Standard, false).is_err());
    }
}
