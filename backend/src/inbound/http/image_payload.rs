//! Decoding of the `image` request field.
//!
//! Clients send either bare base64 or a `data:<mime>;base64,<payload>` URL.
//! Trailing `=` padding is optional.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::json;

use crate::domain::Error;

/// Details code for image payloads that are not valid base64.
pub const INVALID_BASE64_CODE: &str = "invalid_base64";
/// Details code for decoded images over the configured size limit.
pub const IMAGE_TOO_LARGE_CODE: &str = "image_too_large";

/// Standard alphabet, padded or not.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn invalid_base64() -> Error {
    Error::invalid_request("Image must be base64 encoded.")
        .with_details(json!({ "field": "image", "code": INVALID_BASE64_CODE }))
}

fn strip_data_url(encoded: &str) -> Result<&str, Error> {
    let Some(rest) = encoded.strip_prefix("data:") else {
        return Ok(encoded);
    };
    let (header, payload) = rest.split_once(',').ok_or_else(invalid_base64)?;
    if header.ends_with(";base64") {
        Ok(payload)
    } else {
        Err(invalid_base64())
    }
}

/// Decode an `image` field into raw bytes.
///
/// A blank field yields `Ok(None)` so presence validation reports it as
/// missing rather than malformed.
///
/// # Errors
///
/// Returns an `invalid_request` error with details code `invalid_base64` for
/// undecodable input, or `image_too_large` when the decoded image exceeds
/// `max_bytes`.
pub fn decode_image(encoded: Option<&str>, max_bytes: usize) -> Result<Option<Vec<u8>>, Error> {
    let Some(encoded) = encoded.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let payload: String = strip_data_url(encoded)?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT.decode(payload).map_err(|_| invalid_base64())?;
    if bytes.len() > max_bytes {
        return Err(Error::invalid_request(format!(
            "Image exceeds the {max_bytes} byte limit."
        ))
        .with_details(json!({ "field": "image", "code": IMAGE_TOO_LARGE_CODE })));
    }
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LIMIT: usize = 1024;

    #[rstest]
    #[case::bare("/9j/4A==", vec![0xff, 0xd8, 0xff, 0xe0])]
    #[case::data_url("data:image/jpeg;base64,/9j/4A==", vec![0xff, 0xd8, 0xff, 0xe0])]
    #[case::wrapped_lines("/9j/\n4A==", vec![0xff, 0xd8, 0xff, 0xe0])]
    #[case::unpadded("/9j/4A", vec![0xff, 0xd8, 0xff, 0xe0])]
    #[case::unpadded_data_url("data:image/jpeg;base64,/9j/4A", vec![0xff, 0xd8, 0xff, 0xe0])]
    fn decodes_supported_forms(#[case] encoded: &str, #[case] expected: Vec<u8>) {
        assert_eq!(decode_image(Some(encoded), LIMIT), Ok(Some(expected)));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::blank(Some("   "))]
    fn blank_input_is_absent(#[case] encoded: Option<&str>) {
        assert_eq!(decode_image(encoded, LIMIT), Ok(None));
    }

    #[rstest]
    #[case::not_base64("not base64!")]
    #[case::data_url_without_base64("data:image/jpeg,rawbytes")]
    #[case::data_url_without_payload("data:image/jpeg;base64")]
    fn rejects_undecodable_input(#[case] encoded: &str) {
        let error = decode_image(Some(encoded), LIMIT).expect_err("invalid input");
        assert_eq!(error.detail_code(), Some(INVALID_BASE64_CODE));
    }

    #[rstest]
    fn rejects_oversized_images() {
        let error = decode_image(Some("/9j/4A=="), 3).expect_err("too large");
        assert_eq!(error.detail_code(), Some(IMAGE_TOO_LARGE_CODE));
    }
}
