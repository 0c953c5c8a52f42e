/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw
/// config text.
///
/// Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with an injectable lookup, so tests don't
/// touch the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // '{'

        let mut body = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            body.push(c);
        }

        if !closed || body.is_empty() {
            // Malformed, emit literally.
            result.push_str("${");
            result.push_str(&body);
            if closed {
                result.push('}');
            }
            continue;
        }

        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body.as_str(), None),
        };

        let value = lookup(name).filter(|v| !v.is_empty() || fallback.is_none());
        match (value, fallback) {
            (Some(val), _) => result.push_str(&val),
            (None, Some(fallback)) => result.push_str(fallback),
            (None, None) => {
                result.push_str("${");
                result.push_str(&body);
                result.push('}');
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "NOWPLAY_TEST_CLIENT" => Some("abc123".to_string()),
            "NOWPLAY_TEST_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("client_id = \"${NOWPLAY_TEST_CLIENT}\"", lookup),
            "client_id = \"abc123\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${NOWPLAY_NONEXISTENT_XYZ}", lookup),
            "${NOWPLAY_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn uses_fallback_for_missing_or_empty() {
        assert_eq!(
            substitute_env_with("${NOWPLAY_NONEXISTENT_XYZ:-8888}", lookup),
            "8888"
        );
        assert_eq!(substitute_env_with("${NOWPLAY_TEST_EMPTY:-x}", lookup), "x");
        assert_eq!(
            substitute_env_with("${NOWPLAY_TEST_CLIENT:-x}", lookup),
            "abc123"
        );
    }

    #[test]
    fn malformed_placeholder_is_literal() {
        assert_eq!(substitute_env_with("${unterminated", lookup), "${unterminated");
        assert_eq!(substitute_env_with("cost: $5", lookup), "cost: $5");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
