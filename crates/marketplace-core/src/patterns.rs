//! Regex patterns shared by the validators

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic address check: one `@`, no whitespace, dotted domain
    pub static ref EMAIL: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap();

    /// `{{ field_name }}` markers inside template bodies
    pub static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();

    /// Bar numbers are alphanumeric with optional dashes
    pub static ref BAR_NUMBER: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-]{2,31}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("client@example.com"));
        assert!(is_valid_email("first.last+legal@law-firm.co.uk"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("user@localhost"));
    }

    #[test]
    fn test_placeholder_captures_name() {
        let caps: Vec<_> = PLACEHOLDER
            .captures_iter("Dear {{ landlord_name }}, re: {{address}}")
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(caps, vec!["landlord_name", "address"]);
    }

    #[test]
    fn test_bar_number_pattern() {
        assert!(BAR_NUMBER.is_match("FL-0123456"));
        assert!(BAR_NUMBER.is_match("123456"));
        assert!(!BAR_NUMBER.is_match("-12"));
        assert!(!BAR_NUMBER.is_match("12 34"));
    }
}
