//! Phone number normalization for the gateway and for storage.
//!
//! The gateway wants the country code without a leading `+`
//! (`919876543210`); storage and display use the international form
//! (`+919876543210`). Numbers that already carry the country code or a
//! `+` are never prefixed twice.

/// Country calling code prepended to local numbers.
pub const COUNTRY_CODE: &str = "91";

/// Length of a local subscriber number.
pub const LOCAL_NUMBER_LEN: usize = 10;

/// True when `phone` is exactly ten ASCII digits.
pub fn is_local_number(phone: &str) -> bool {
    phone.len() == LOCAL_NUMBER_LEN && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Country-code-prefixed form used in gateway request paths.
pub fn format_for_api(phone: &str) -> String {
    let phone = phone.trim();
    if let Some(international) = phone.strip_prefix('+') {
        return international.to_string();
    }
    if is_local_number(phone) {
        format!("{COUNTRY_CODE}{phone}")
    } else {
        phone.to_string()
    }
}

/// `+`-prefixed international form used for persistence.
pub fn format_for_storage(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+{}", format_for_api(phone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_number_is_prefixed() {
        assert_eq!(format_for_api("9876543210"), "919876543210");
        assert_eq!(format_for_storage("9876543210"), "+919876543210");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        for phone in ["9876543210", "9123456789", "7000000001"] {
            let api = format_for_api(phone);
            assert_eq!(format_for_api(&api), api);

            let stored = format_for_storage(phone);
            assert_eq!(format_for_storage(&stored), stored);
        }
    }

    #[test]
    fn test_number_with_country_code_passes_through() {
        assert_eq!(format_for_api("919876543210"), "919876543210");
        assert_eq!(format_for_storage("919876543210"), "+919876543210");
        assert_eq!(format_for_storage("+919876543210"), "+919876543210");
    }

    #[test]
    fn test_plus_is_stripped_for_api() {
        assert_eq!(format_for_api("+919876543210"), "919876543210");
    }

    #[test]
    fn test_local_number_that_starts_with_country_code_digits() {
        // Ten digits is always a local number, even when it begins with 91.
        assert_eq!(format_for_api("9198765432"), "919198765432");
    }

    #[test]
    fn test_is_local_number() {
        assert!(is_local_number("9876543210"));
        assert!(!is_local_number("987654321"));
        assert!(!is_local_number("98765432100"));
        assert!(!is_local_number("98765o3210"));
        assert!(!is_local_number("+919876543"));
    }
}
