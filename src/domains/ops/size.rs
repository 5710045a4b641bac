//! Human-style byte count parsing (`10K`, `3MiB`, `512`).

use crate::domains::tools::{ToolError, ToolResult};

/// Binary unit letters in ascending order; index + 1 is the power of 1024.
const UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// Parse a positive byte count with an optional binary unit suffix.
///
/// The suffix is one of `K M G T P E` (any case), optionally followed by `B`
/// or `iB`. Zero, negative, overflowing or malformed input is `InvalidSize`.
pub fn parse_size(input: &str) -> ToolResult<u64> {
    let invalid = || ToolError::InvalidSize(input.to_string());
    let trimmed = input.trim();

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(digits_end);
    if digits.is_empty() {
        return Err(invalid());
    }
    let magnitude: u64 = digits.parse().map_err(|_| invalid())?;

    let power = match suffix {
        "" | "B" | "b" => 0,
        _ => {
            let mut chars = suffix.chars();
            let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
            let rest = chars.as_str();
            if !matches!(rest, "" | "B" | "b" | "iB" | "ib") {
                return Err(invalid());
            }
            let index = UNITS.iter().position(|u| *u == letter).ok_or_else(invalid)?;
            index as u32 + 1
        }
    };

    let size = 1024u64
        .checked_pow(power)
        .and_then(|scale| magnitude.checked_mul(scale))
        .ok_or_else(invalid)?;
    if size == 0 {
        return Err(invalid());
    }
    Ok(size)
}
