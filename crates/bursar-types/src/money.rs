//! Minor-unit money representation and rounding policy.
//!
//! All amounts in Bursar are `u64` kobo (the smallest currency unit).
//! Naira values exist only at presentation boundaries. Percentage shares
//! round to the nearest kobo; whoever takes the remainder is decided by
//! the caller, never here.

/// Kobo per naira.
pub const KOBO_PER_NAIRA: u64 = 100;

/// Convert a naira amount to kobo. `None` on overflow.
pub fn naira_to_kobo(naira: u64) -> Option<u64> {
    naira.checked_mul(KOBO_PER_NAIRA)
}

/// Convert kobo to whole naira, truncating sub-naira remainder.
pub fn kobo_to_naira(kobo: u64) -> u64 {
    kobo / KOBO_PER_NAIRA
}

/// Compute `gross * pct / 100` rounded to the nearest kobo (half rounds up).
///
/// Returns `None` on overflow. Percentages above 100 are accepted here;
/// range validation belongs to the split calculator.
pub fn percentage_share(gross: u64, pct: u8) -> Option<u64> {
    gross
        .checked_mul(u64::from(pct))?
        .checked_add(50)
        .map(|v| v / 100)
}

/// Render a kobo amount as a naira string for logs and receipts.
pub fn format_kobo(kobo: u64) -> String {
    format!("\u{20a6}{}.{:02}", kobo / KOBO_PER_NAIRA, kobo % KOBO_PER_NAIRA)
}
