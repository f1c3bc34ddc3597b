//! Text helpers shared by the registry, resolver and filters.

use crate::types::Substitution;

/// Field keys: lowercase, spaces become dashes ("Tag Blacklist" -> "tag-blacklist").
pub fn to_kebab_case(text: &str) -> String {
    text.to_lowercase().replace(' ', "-")
}

/// Attribute keys: lowercase, spaces become underscores.
pub fn attribute_key(text: &str) -> String {
    text.to_lowercase().replace(' ', "_")
}

/// Trim every string and drop the empty ones.
pub fn trim_and_keep_non_empty<'a, I>(strings: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    strings
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split textarea content into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    trim_and_keep_non_empty(text.lines())
}

/// Range check where a non-positive bound is treated as absent.
pub fn is_in_range(value: i64, lower_bound: i64, upper_bound: i64) -> bool {
    match (lower_bound > 0, upper_bound > 0) {
        (true, true) => value >= lower_bound && value <= upper_bound,
        (true, false) => value >= lower_bound,
        (false, true) => value <= upper_bound,
        (false, false) => true,
    }
}

/// Apply every substitution in order, then trim.
pub fn sanitize(text: &str, substitutions: &[Substitution]) -> String {
    let mut result = text.to_string();
    for substitution in substitutions {
        result = substitution
            .pattern
            .replace_all(&result, substitution.substitute.as_str())
            .into_owned();
    }
    result.trim().to_string()
}

/// Parse `MM:SS` or `H:MM:SS` into seconds.
///
/// `"0:00"` parses to zero; hosts render it for items whose length is
/// unknown, so callers filtering by duration treat zero as absent. Text that
/// does not parse or overflows yields `None`.
pub fn parse_duration(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut seconds = 0i64;
    for part in text.split(':') {
        let value: i64 = part.trim().parse().ok()?;
        if value < 0 {
            return None;
        }
        seconds = seconds.checked_mul(60)?.checked_add(value)?;
    }
    Some(seconds)
}

/// Parse a rating label such as `"87%"`.
pub fn parse_percentage(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .trim_end_matches('%')
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    #[test]
    fn test_keys() {
        assert_eq!(to_kebab_case("Tag Blacklist"), "tag-blacklist");
        assert_eq!(attribute_key("Processed Once"), "processed_once");
        assert_eq!(attribute_key("processedOnce"), "processedonce");
    }

    #[test]
    fn test_is_in_range() {
        assert!(is_in_range(150, 60, 600));
        assert!(!is_in_range(30, 60, 600));
        assert!(!is_in_range(900, 60, 600));
        assert!(is_in_range(900, 60, 0));
        assert!(!is_in_range(900, 0, 600));
        assert!(is_in_range(5, 0, 0));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2:30"), Some(150));
        assert_eq!(parse_duration(" 12:05 "), Some(725));
        assert_eq!(parse_duration("1:02:03"), Some(3723));
        assert_eq!(parse_duration("0:00"), Some(0));
        assert_eq!(parse_duration("HD"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("999999999999999999:0:0"), None);
        assert_eq!(parse_duration("153722867280912930:8"), None);
        assert_eq!(parse_duration("9223372036854775807"), Some(i64::MAX));
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("87%"), Some(87));
        assert_eq!(parse_percentage(" 100 % "), Some(100));
        assert_eq!(parse_percentage("n/a"), None);
    }

    #[test]
    fn test_sanitize() {
        let pattern = RegexBuilder::new(r"(\bn\b|\bplus\b)")
            .case_insensitive(true)
            .build()
            .unwrap();
        let rules = vec![Substitution { substitute: "and".to_string(), pattern }];
        assert_eq!(sanitize(" Rock N Roll plus more ", &rules), "Rock and Roll and more");
        assert_eq!(sanitize(" untouched ", &[]), "untouched");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\n\n  b  \r\n"), vec!["a".to_string(), "b".to_string()]);
    }
}
