//! Barcode validation: candidate extraction and per-symbology checksums.
//!
//! OCR output frequently carries stray digits on either side of the printed
//! code (price tags, bar artifacts), so a digit string is sliced into every
//! plausible candidate before checksums are run.

use crate::models::{Symbology, ValidatedBarcode};
use thiserror::Error;

/// Candidate lengths in priority order: EAN-13, UPC-A, EAN-8, ITF-14
pub const CANDIDATE_LENGTHS: [usize; 4] = [13, 12, 8, 14];

pub const MIN_CODE_LENGTH: usize = 8;
pub const MAX_CODE_LENGTH: usize = 14;

/// Find the first structurally valid barcode inside `digits`.
///
/// Returns None for any input containing a non-digit, or when no candidate
/// passes its checksum.
pub fn validate_barcode(digits: &str) -> Option<ValidatedBarcode> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    candidates(digits).into_iter().find_map(|candidate| {
        let symbology = Symbology::from_length(candidate.len())?;
        checksum_ok(candidate, symbology).then(|| ValidatedBarcode::new(candidate, symbology))
    })
}

/// Slices of `digits` worth validating, in the order they are tried.
///
/// For each length in [`CANDIDATE_LENGTHS`] the leading slice comes first,
/// then the trailing one when the input is longer. The whole input is added
/// last if it is 8-14 digits and not already present.
pub fn candidates(digits: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    let len = digits.len();

    for length in CANDIDATE_LENGTHS {
        if len < length {
            continue;
        }
        out.push(&digits[..length]);
        if len > length {
            out.push(&digits[len - length..]);
        }
    }

    if (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&len) && !out.contains(&digits) {
        out.push(digits);
    }

    out
}

/// Run the checksum for `symbology` against `code`
pub fn checksum_ok(code: &str, symbology: Symbology) -> bool {
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    match symbology.expected_length() {
        Some(expected) => code.len() == expected && weighted_check(code),
        None => (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len()),
    }
}

/// Check digit for a digit payload using 1/3 alternating weights
/// (weight 3 on odd 0-based positions). Returns None for non-digit input.
pub fn check_digit(payload: &str) -> Option<u8> {
    weighted_check_digit(payload.as_bytes())
}

fn weighted_check_digit(payload: &[u8]) -> Option<u8> {
    let mut sum: u32 = 0;
    for (i, b) in payload.iter().enumerate() {
        if !b.is_ascii_digit() {
            return None;
        }
        let weight = if i % 2 == 1 { 3 } else { 1 };
        sum += u32::from(b - b'0') * weight;
    }
    Some(((10 - sum % 10) % 10) as u8)
}

// EAN-13, UPC-A, EAN-8 and ITF-14 share this scheme. UPC-A is weighted over
// its own 11 payload digits without the implicit leading zero.
fn weighted_check(code: &str) -> bool {
    match code.as_bytes().split_last() {
        Some((&last, payload)) => weighted_check_digit(payload) == Some(last - b'0'),
        None => false,
    }
}

/// Reasons a hand-typed barcode is refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManualEntryError {
    #[error("barcode must contain only numbers")]
    NotDigits,

    #[error("barcode must be between 8 and 14 digits long (got {0})")]
    Length(usize),

    #[error("invalid barcode format or checksum")]
    Checksum,
}

/// Validate a code typed in by hand
pub fn validate_manual_entry(input: &str) -> Result<ValidatedBarcode, ManualEntryError> {
    let code = input.trim();

    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ManualEntryError::NotDigits);
    }
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len()) {
        return Err(ManualEntryError::Length(code.len()));
    }

    validate_barcode(code).ok_or(ManualEntryError::Checksum)
}
