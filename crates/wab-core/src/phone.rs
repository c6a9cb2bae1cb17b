//! Phone number normalization.
//!
//! This is a heuristic, not a validated parse: the last 10 digits are treated as
//! the local number and anything in front of them as the country code. There is
//! no table of real country-code lengths.

/// Number of trailing digits treated as the local number.
pub const LOCAL_NUMBER_LEN: usize = 10;

/// Minimum digit count for a phone to be accepted.
pub const MIN_PHONE_LEN: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhoneParts {
    pub country_code: String,
    pub local_number: String,
}

/// Keep only ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Strip non-digits and prepend `default_country_code` to short or zero-prefixed numbers.
///
/// Numbers longer than 10 digits that do not start with `0` are assumed to
/// already carry a country code and are returned digit-stripped.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() <= LOCAL_NUMBER_LEN || digits.starts_with('0') {
        let stripped = digits.trim_start_matches('0');
        return format!("{default_country_code}{stripped}");
    }
    digits
}

/// Split a normalized phone into country code and local number.
pub fn split_phone(phone: &str) -> PhoneParts {
    let digits = digits_only(phone);
    if digits.len() <= LOCAL_NUMBER_LEN {
        return PhoneParts {
            country_code: String::new(),
            local_number: digits,
        };
    }
    let (cc, local) = digits.split_at(digits.len() - LOCAL_NUMBER_LEN);
    PhoneParts {
        country_code: cc.to_string(),
        local_number: local.to_string(),
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    !phone.is_empty() && phone.len() >= MIN_PHONE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digit_number_gets_default_country_code() {
        assert_eq!(normalize_phone("9876543210", "91"), "919876543210");
        assert_eq!(normalize_phone("98765-43210", "91"), "919876543210");
    }

    #[test]
    fn leading_zeros_are_stripped_before_prefixing() {
        assert_eq!(normalize_phone("09876543210", "91"), "919876543210");
        assert_eq!(normalize_phone("00447700900123", "91"), "91447700900123");
    }

    #[test]
    fn long_numbers_are_kept_as_digits() {
        assert_eq!(normalize_phone("+44 7700 900123", "91"), "447700900123");
        assert_eq!(normalize_phone("+1 (415) 555-0100", "91"), "14155550100");
    }

    #[test]
    fn short_input_stays_short_and_is_rejected() {
        let p = normalize_phone("12345", "91");
        assert_eq!(p, "9112345");
        assert!(!is_valid_phone(&p));
        assert!(!is_valid_phone(&normalize_phone("", "")));
    }

    #[test]
    fn split_takes_last_ten_digits_as_local() {
        let parts = split_phone("919876543210");
        assert_eq!(parts.country_code, "91");
        assert_eq!(parts.local_number, "9876543210");

        let parts = split_phone("9876543210");
        assert_eq!(parts.country_code, "");
        assert_eq!(parts.local_number, "9876543210");
    }

    #[test]
    fn split_parts_concatenate_back_to_phone() {
        for phone in ["14155550100", "919876543210", "3519123456789", "9876543210"] {
            let p = split_phone(phone);
            assert_eq!(format!("{}{}", p.country_code, p.local_number), phone);
        }
    }
}
