// ✉️ Email Validation & Cleaning
// Strict and loose validation plus repair of the common ".con" typo.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    static ref GMAIL_RE: Regex = Regex::new(r"(?i)@gmail\.com\b").unwrap();
}

/// Strict shape check: local part, one `@`, dotted domain with an
/// alphabetic top-level domain of at least two letters.
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Loose check: the string merely contains `@` and `.` somewhere.
pub fn loose_validate_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

pub fn is_gmail(email: &str) -> bool {
    GMAIL_RE.is_match(email)
}

/// The email itself when valid, empty string otherwise.
pub fn keep_valid_email(email: &str, loose_rules: bool) -> String {
    let valid = if loose_rules {
        loose_validate_email(email)
    } else {
        validate_email(email)
    };
    if valid {
        email.to_string()
    } else {
        String::new()
    }
}

/// Upper-fold and repair a trailing ".CON" typo to ".COM".
pub fn fix_con_to_com(email: &str) -> String {
    let email = email.to_uppercase();
    match email.rsplit_once('.') {
        Some((head, "CON")) => format!("{}.COM", head),
        _ => email,
    }
}

/// Everything after the last `@`.
pub fn email_domain(email: &str) -> &str {
    email.rsplit('@').next().unwrap_or(email)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.com"));
        assert!(validate_email("first.last+tag@sub.domain.org"));
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("missing@tld"));
        assert!(!validate_email("two@@signs.com"));
    }

    #[test]
    fn test_loose_validation() {
        assert!(loose_validate_email("weird@thing."));
        assert!(!loose_validate_email("no-at-sign.com"));
    }

    #[test]
    fn test_gmail_check() {
        assert!(is_gmail("someone@GMAIL.com"));
        assert!(!is_gmail("someone@gmail.company.net"));
    }

    #[test]
    fn test_keep_valid_email() {
        assert_eq!(keep_valid_email("a@b.com", false), "a@b.com");
        assert_eq!(keep_valid_email("nope", false), "");
        assert_eq!(keep_valid_email("loose@ok.", true), "loose@ok.");
    }

    #[test]
    fn test_fix_con_to_com() {
        assert_eq!(fix_con_to_com("user@domain.con"), "USER@DOMAIN.COM");
        assert_eq!(fix_con_to_com("user@domain.com"), "USER@DOMAIN.COM");
        assert_eq!(fix_con_to_com("user@context.net"), "USER@CONTEXT.NET");
    }

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("user@domain.com"), "domain.com");
        assert_eq!(email_domain("plain-text"), "plain-text");
    }
}
