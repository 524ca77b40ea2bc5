//! Phone number normalization for outbound sends.

/// Normalize a raw phone number: strip every non-digit character, then
/// prepend `country_code` if the result looks like a bare national number
/// (10-11 digits without the code).
///
/// Anything outside that shape passes through digits-only but otherwise
/// unchanged: numbers already prefixed, short codes, or garbage are the
/// caller's problem to reject.
pub fn normalize(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if (10..=11).contains(&digits.len()) && !digits.starts_with(country_code) {
        return format!("{country_code}{digits}");
    }

    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_mobile_gains_prefix() {
        // 11 digits (area + 9-digit mobile), no country code.
        assert_eq!(normalize("11988887777", "55"), "5511988887777");
    }

    #[test]
    fn test_bare_landline_gains_prefix() {
        // 10 digits (area + 8-digit landline).
        assert_eq!(normalize("1133334444", "55"), "551133334444");
    }

    #[test]
    fn test_already_prefixed_unchanged() {
        assert_eq!(normalize("5511988887777", "55"), "5511988887777");
    }

    #[test]
    fn test_prefix_collision_not_doubled() {
        // 11 digits starting with the country code: ambiguous, left alone.
        assert_eq!(normalize("55988887777", "55"), "55988887777");
    }

    #[test]
    fn test_formatting_stripped() {
        assert_eq!(normalize("+55 (11) 98888-7777", "55"), "5511988887777");
        assert_eq!(normalize("(11) 98888-7777", "55"), "5511988887777");
    }

    #[test]
    fn test_short_input_unchanged() {
        assert_eq!(normalize("190", "55"), "190");
        assert_eq!(normalize("", "55"), "");
    }

    #[test]
    fn test_long_input_unchanged() {
        // 12+ digits: treated as already international.
        assert_eq!(normalize("351912345678", "55"), "351912345678");
    }

    #[test]
    fn test_other_country_code() {
        assert_eq!(normalize("2125550123", "1"), "12125550123");
    }
}
