//! # Phone Masking
//!
//! Formatting helpers for phone inputs on storefront forms.
//!
//! ## Mask
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Area code + 8 digits (landline)   (11) 2345-6789                       │
//! │  Area code + 9 digits (mobile)     (11) 98765-4321                      │
//! │                                                                         │
//! │  As the shopper types:                                                  │
//! │    "1"          → "(1"                                                  │
//! │    "11"         → "(11"                                                 │
//! │    "119"        → "(11) 9"                                              │
//! │    "1198765"    → "(11) 98765"                                          │
//! │    "11987654"   → "(11) 9876-54"                                        │
//! │    "11987654321"→ "(11) 98765-4321"                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The hyphen sits four digits from the end once the local part is long
//! enough, so landlines and mobiles share one mask.

/// Maximum digits kept (2 area + 9 local).
pub const MAX_PHONE_DIGITS: usize = 11;

const AREA_DIGITS: usize = 2;

/// Strips everything except ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Masks whatever the shopper has typed so far.
///
/// Non-digits are ignored and digits past the eleventh are dropped, so the
/// function can be re-applied on every keystroke.
///
/// ## Example
/// ```rust
/// use coupon_core::format::mask_phone;
///
/// assert_eq!(mask_phone("11987654321"), "(11) 98765-4321");
/// assert_eq!(mask_phone("(11) 2345-6789"), "(11) 2345-6789");
/// assert_eq!(mask_phone("119"), "(11) 9");
/// ```
pub fn mask_phone(input: &str) -> String {
    let digits: String = digits_only(input).chars().take(MAX_PHONE_DIGITS).collect();

    if digits.is_empty() {
        return String::new();
    }

    if digits.len() <= AREA_DIGITS {
        return format!("({}", digits);
    }

    let (area, local) = digits.split_at(AREA_DIGITS);

    // Up to five local digits there is nothing to split yet.
    if local.len() <= 5 {
        return format!("({}) {}", area, local);
    }

    let split = if local.len() >= 8 { local.len() - 4 } else { 4 };
    let (head, tail) = local.split_at(split);
    format!("({}) {}-{}", area, head, tail)
}

/// Value to submit: the bare digits.
pub fn unmask_phone(input: &str) -> String {
    digits_only(input)
}

/// A full landline (10 digits) or mobile (11 digits) number.
pub fn is_complete_phone(input: &str) -> bool {
    matches!(digits_only(input).len(), 10 | 11)
}

// =============================================================================
// Unit Tests
// =============================================================================
