//! Currencies accounts may hold.

/// Currency codes accepted for accounts and transfers.
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["USD", "EUR", "CAD"];

/// Whether `code` is a supported currency. Codes are case-sensitive.
#[must_use]
pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}
