//! Encoding detection and transcoding for byte input.
//!
//! Implements BOM sniffing and XML declaration encoding detection per
//! XML 1.0 §4.3.3 and Appendix F, bridging to `encoding_rs` for the actual
//! character conversion:
//!
//! 1. Check for a Byte Order Mark at the start of the input.
//! 2. If a BOM is found, use the indicated encoding and skip the BOM bytes;
//!    otherwise default to UTF-8.
//! 3. After the initial decode, inspect the XML declaration's `encoding=`
//!    attribute and re-decode from the original bytes if it names something
//!    else.

use crate::error::{Error, ParseError, Result, SourceLocation};

fn encoding_error(message: impl Into<String>) -> Error {
    Error::Parse(ParseError {
        message: message.into(),
        location: SourceLocation::default(),
    })
}

/// Detects the encoding of an XML byte stream from its Byte Order Mark.
///
/// Returns the IANA charset name and the number of BOM bytes to skip.
/// Without a BOM the XML default of UTF-8 applies.
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        ("UTF-8", 3)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        ("UTF-16BE", 2)
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        ("UTF-16LE", 2)
    } else {
        ("UTF-8", 0)
    }
}

/// Transcodes a byte slice from the named encoding into a UTF-8 `String`.
///
/// # Errors
///
/// Fails when the encoding label is unknown to `encoding_rs` or the input
/// contains byte sequences malformed for that encoding.
pub fn transcode(bytes: &[u8], encoding_name: &str) -> Result<String> {
    let encoding = encoding_rs::Encoding::for_label(encoding_name.as_bytes())
        .ok_or_else(|| encoding_error(format!("unsupported encoding '{encoding_name}'")))?;
    let (result, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(encoding_error(format!(
            "malformed byte sequence for encoding '{encoding_name}'"
        )));
    }
    Ok(result.into_owned())
}

/// Decodes raw XML bytes into UTF-8, automatically detecting the encoding.
///
/// # Errors
///
/// Fails when the bytes are invalid for the detected encoding or the
/// declared encoding is unsupported.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);
    let content = &bytes[bom_skip..];

    if bom_encoding == "UTF-8" {
        // Fast path: validate in place, honoring a contrary declaration.
        if let Ok(text) = std::str::from_utf8(content) {
            if let Some(declared) = declared_encoding(text) {
                if !is_utf8_label(&declared) {
                    return transcode(content, &declared);
                }
            }
            return Ok(text.to_string());
        }
        // Not UTF-8 and no BOM; the declaration is ASCII-compatible by
        // definition, so scan the raw bytes for it.
        if let Some(declared) = declared_encoding_from_bytes(content) {
            return transcode(content, &declared);
        }
        return Err(encoding_error("input is not valid UTF-8"));
    }

    let initial = transcode(content, bom_encoding)?;
    if let Some(declared) = declared_encoding(&initial) {
        let declared_upper = declared.to_ascii_uppercase();
        let bom_upper = bom_encoding.to_ascii_uppercase();
        // "UTF-16" matches either byte order; the BOM already decided it.
        let same = declared_upper == bom_upper
            || (declared_upper == "UTF-16" && bom_upper.starts_with("UTF-16"));
        if !same {
            return transcode(content, &declared);
        }
    }
    Ok(initial)
}

/// Extracts the `encoding` attribute from an XML declaration with a
/// lightweight scan, without running the tokenizer.
fn declared_encoding(text: &str) -> Option<String> {
    let decl_end = text.find("?>")?;
    let decl = &text[..decl_end];
    if !decl.starts_with("<?xml") {
        return None;
    }
    let after = decl[decl.find("encoding")? + "encoding".len()..].trim_start();
    let after = after.strip_prefix('=')?.trim_start();
    let quote = after.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value = &after[1..];
    Some(value[..value.find(quote)?].to_string())
}

/// Byte-level variant of [`declared_encoding`], for input that is not valid
/// UTF-8. The declaration itself is always ASCII-compatible.
fn declared_encoding_from_bytes(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(200)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];
    let enc_pos = decl.windows(8).position(|w| w == b"encoding")?;
    let after = skip_ascii_whitespace(&decl[enc_pos + 8..]);
    let after = skip_ascii_whitespace(after.strip_prefix(b"=".as_slice())?);
    let quote = *after.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &after[1..];
    let end = value.iter().position(|&b| b == quote)?;
    let label = &value[..end];
    label
        .iter()
        .all(u8::is_ascii)
        .then(|| String::from_utf8_lossy(label).into_owned())
}

fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("UTF-8") || label.eq_ignore_ascii_case("UTF8")
}
