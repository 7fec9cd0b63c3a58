//! Naming helpers shared by the mapper and the code generator.

/// Maximum length of a generated tool name.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Split an identifier into lowercase words.
///
/// Word boundaries are non-alphanumeric characters, lower-to-upper case
/// transitions (`userId`) and the end of an acronym (`HTTPServer`).
pub fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Convert a string to snake_case.
pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

/// Convert a string to SCREAMING_SNAKE_CASE.
pub fn to_screaming_snake_case(s: &str) -> String {
    to_snake_case(s).to_ascii_uppercase()
}

/// Sanitize a name into a tool identifier: snake_case, `[a-z0-9_]`, never
/// empty, never starting with a digit, at most [`MAX_TOOL_NAME_LEN`] chars.
pub fn sanitize_tool_name(name: &str) -> String {
    let mut result = to_snake_case(name);
    if result.is_empty() {
        result = "tool".to_string();
    }
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result = format!("_{result}");
    }
    if result.len() > MAX_TOOL_NAME_LEN {
        result.truncate(MAX_TOOL_NAME_LEN);
        while result.ends_with('_') {
            result.pop();
        }
    }
    result
}

/// Input field name under which a header parameter is exposed.
///
/// `X-Request-ID` becomes `header_X_Request_ID`. The original header name is
/// kept next to it in the IR, so nothing has to be decoded at call time.
pub fn header_field_name(header: &str) -> String {
    let encoded: String = header
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("header_{encoded}")
}

/// Pick `base`, or `base_2`, `base_3`, ... until `taken` returns false.
pub fn dedupe_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    dedupe_name_within(base, usize::MAX, taken)
}

/// Like [`dedupe_name`], shortening `base` so that suffixed candidates stay
/// within `max_len` bytes. `base` itself is expected to fit already.
pub fn dedupe_name_within(base: &str, max_len: usize, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let suffix = format!("_{n}");
        let mut keep = max_len.saturating_sub(suffix.len()).min(base.len());
        while !base.is_char_boundary(keep) {
            keep -= 1;
        }
        let stem = base[..keep].trim_end_matches('_');
        let candidate = format!("{stem}{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Escape a string for use in a double-quoted JavaScript/TypeScript literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if u32::from(c) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// Check if a property key must be quoted in a JS object literal.
pub fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("userId"), vec!["user", "id"]);
        assert_eq!(split_words("HTTPServer"), vec!["http", "server"]);
        assert_eq!(split_words("get-users_by.id"), vec!["get", "users", "by", "id"]);
        assert_eq!(split_words("v2Items"), vec!["v2", "items"]);
        assert!(split_words("--").is_empty());
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("listPetsByOwner"), "list_pets_by_owner");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_screaming_snake_case("bearerAuth"), "BEARER_AUTH");
    }

    #[test]
    fn test_sanitize_tool_name() {
        assert_eq!(sanitize_tool_name("getUser"), "get_user");
        assert_eq!(sanitize_tool_name("123go"), "_123go");
        assert_eq!(sanitize_tool_name("!!!"), "tool");
        let long = "a".repeat(100);
        assert_eq!(sanitize_tool_name(&long).len(), MAX_TOOL_NAME_LEN);
    }

    #[test]
    fn test_header_field_name() {
        assert_eq!(header_field_name("X-Request-ID"), "header_X_Request_ID");
        assert_eq!(header_field_name("Accept"), "header_Accept");
    }

    #[test]
    fn test_dedupe_name() {
        let taken = ["a", "a_2"];
        assert_eq!(dedupe_name("a", |n| taken.contains(&n)), "a_3");
        assert_eq!(dedupe_name("b", |n| taken.contains(&n)), "b");
    }

    #[test]
    fn test_dedupe_name_within_keeps_length() {
        let base = sanitize_tool_name(&"a".repeat(100));
        let second = dedupe_name_within(&base, MAX_TOOL_NAME_LEN, |n| n == base);
        assert_eq!(second.len(), MAX_TOOL_NAME_LEN);
        assert!(second.ends_with("a_2"));

        let stem = format!("{}_b", "a".repeat(61));
        let taken = [stem.clone()];
        let next = dedupe_name_within(&stem, MAX_TOOL_NAME_LEN, |n| taken.iter().any(|t| t == n));
        assert_eq!(next, format!("{}_2", "a".repeat(61)));
        assert!(next.len() <= MAX_TOOL_NAME_LEN);
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("hel\"lo"), "hel\\\"lo");
        assert_eq!(escape_js_string("a\\b"), "a\\\\b");
        assert_eq!(escape_js_string("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_needs_quoting() {
        assert!(!needs_quoting("foo"));
        assert!(!needs_quoting("$foo_1"));
        assert!(needs_quoting("foo-bar"));
        assert!(needs_quoting("1abc"));
        assert!(needs_quoting(""));
    }
}
