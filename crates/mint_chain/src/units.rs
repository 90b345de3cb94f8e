//! Display-unit (ether) ⇄ base-unit (wei) conversion for payment amounts.

use alloy_primitives::U256;
use alloy_primitives::utils::{format_ether, parse_ether};
use mint_core::MintError;

/// Number of fractional digits between the display unit and the base unit.
pub const BASE_UNIT_DECIMALS: usize = 18;

/// Convert a display amount such as `"0.25"` into base units.
///
/// The conversion is exact: amounts with more fractional digits than the base
/// unit can represent are rejected rather than truncated.
pub fn to_base_units(display: &str) -> Result<U256, MintError> {
    let canonical = canonicalize(display)?;
    parse_ether(&canonical).map_err(|e| invalid(display, e.to_string()))
}

/// Render a base-unit amount in display units without trailing zeros.
pub fn format_display(amount: U256) -> String {
    let formatted = format_ether(amount);
    match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                int.to_string()
            } else {
                format!("{int}.{frac}")
            }
        }
        None => formatted,
    }
}

fn canonicalize(display: &str) -> Result<String, MintError> {
    let trimmed = display.trim();
    if trimmed.is_empty() {
        return Err(invalid(display, "empty amount"));
    }

    let (int, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if int.is_empty() && frac.is_empty() {
        return Err(invalid(display, "no digits"));
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid(display, "expected an unsigned decimal number"));
    }
    if frac.len() > BASE_UNIT_DECIMALS {
        return Err(invalid(
            display,
            format!("more than {BASE_UNIT_DECIMALS} fractional digits"),
        ));
    }

    let int = if int.is_empty() { "0" } else { int };
    Ok(if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    })
}

fn invalid(amount: &str, reason: impl Into<String>) -> MintError {
    MintError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.into(),
    }
}
