//! URL-encoded form body parsing.
//!
//! HTML multi-selects submit repeated keys (`labels=1&labels=2`), which
//! the usual single-value form deserialization flattens away, so forms
//! are decoded from the raw body into key/value pairs instead.

use urlencoding::decode;

/// Decode an `application/x-www-form-urlencoded` body into pairs.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            // '+' means space in form encoding; percent-decode the rest
            let decode_part = |s: &str| {
                decode(&s.replace('+', " "))
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            };
            (decode_part(key), decode_part(value))
        })
        .collect()
}

/// First value for a key, if present and non-empty.
pub fn form_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.trim().is_empty())
}

/// All values for a repeated key.
pub fn form_values<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Parse an entity-reference parameter.
///
/// Blank means "no restriction". An unparseable value behaves like a
/// nonexistent row (it can never match), rather than an error or a
/// silently dropped criterion.
pub fn parse_ref_param(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.parse().unwrap_or(-1))
}

/// Checkbox/boolean-ish truthiness: "on", "1", "true".
pub fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("on") | Some("1") | Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pairs() {
        let pairs = parse_form("name=Fix+bug&description=a%26b");
        assert_eq!(form_value(&pairs, "name"), Some("Fix bug"));
        assert_eq!(form_value(&pairs, "description"), Some("a&b"));
    }

    #[test]
    fn blank_values_read_as_absent() {
        let pairs = parse_form("executor=&name=x");
        assert_eq!(form_value(&pairs, "executor"), None);
        assert_eq!(form_value(&pairs, "name"), Some("x"));
    }

    #[test]
    fn repeated_keys_collect_all_values() {
        let pairs = parse_form("labels=1&labels=2&labels=3");
        assert_eq!(form_values(&pairs, "labels"), vec!["1", "2", "3"]);
    }

    #[test]
    fn ref_param_maps_garbage_to_unmatchable_id() {
        assert_eq!(parse_ref_param(None), None);
        assert_eq!(parse_ref_param(Some("")), None);
        assert_eq!(parse_ref_param(Some("7")), Some(7));
        assert_eq!(parse_ref_param(Some("abc")), Some(-1));
    }

    #[test]
    fn truthy_accepts_checkbox_forms() {
        assert!(is_truthy(Some("on")));
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("true")));
        assert!(!is_truthy(Some("off")));
        assert!(!is_truthy(None));
    }
}
