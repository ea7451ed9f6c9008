//! Contact field validators and phone formatting.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// US/Canada numbers: 10 digits, or 11 with a leading country code `1`.
pub fn is_valid_phone(phone: &str) -> bool {
    let cleaned = digits_only(phone);
    cleaned.len() == 10 || (cleaned.len() == 11 && cleaned.starts_with('1'))
}

/// Formats a valid number for display; anything else is returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    let cleaned = digits_only(phone);
    match cleaned.len() {
        10 => format!(
            "({}) {}-{}",
            &cleaned[0..3],
            &cleaned[3..6],
            &cleaned[6..]
        ),
        11 if cleaned.starts_with('1') => format!(
            "+1 ({}) {}-{}",
            &cleaned[1..4],
            &cleaned[4..7],
            &cleaned[7..]
        ),
        _ => phone.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_requires_at_and_dot_after_it() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("guest.name@example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("dot.before@domain"));
        assert!(!is_valid_email("spaces in@b.co"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn phone_accepts_ten_or_eleven_with_country_code() {
        assert!(is_valid_phone("1234567890"));
        assert!(is_valid_phone("(123) 456-7890"));
        assert!(is_valid_phone("+1 123 456 7890"));
        assert!(!is_valid_phone("21234567890"));
        assert!(!is_valid_phone("123456789"));
        assert!(!is_valid_phone("112345678901"));
    }

    #[test]
    fn phone_formatting_matches_display_convention() {
        assert_eq!(format_phone_number("1234567890"), "(123) 456-7890");
        assert_eq!(format_phone_number("11234567890"), "+1 (123) 456-7890");
        assert_eq!(format_phone_number("555-0100"), "555-0100");
    }
}
