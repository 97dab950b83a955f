use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r#"(?i)"?(access_token|refresh_token|id_token|client_secret|code|token)"?\s*[:=]\s*"?([A-Za-z0-9_\-\./~+]{6,})"?"#,
        )
        .expect("valid regex"),
        Regex::new(r"\b(ya29\.[A-Za-z0-9_\-\.]{10,})").expect("valid regex"),
        Regex::new(r"\b(GOCSPX-[A-Za-z0-9_\-]{10,})").expect("valid regex"),
        Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9_\-\.=]{10,}").expect("valid regex"),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionResult {
    pub content: String,
    pub redaction_count: usize,
}

/// Scrubs OAuth credentials from text that is about to be logged.
#[derive(Debug, Default, Clone)]
pub struct Redactor;

impl Redactor {
    pub fn new() -> Self {
        Self
    }

    pub fn redact(&self, input: &str) -> RedactionResult {
        if input.is_empty() {
            return RedactionResult {
                content: String::new(),
                redaction_count: 0,
            };
        }

        let mut result = input.to_string();
        let mut redaction_count = 0usize;

        for pattern in SECRET_PATTERNS.iter() {
            let matches = pattern.find_iter(&result).count();
            if matches == 0 {
                continue;
            }

            redaction_count += matches;
            result = pattern
                .replace_all(&result, |caps: &regex::Captures<'_>| {
                    let key = caps
                        .get(1)
                        .map(|m| m.as_str())
                        .filter(|key| key.len() < 20 && !key.contains('.') && !key.contains('-'))
                        .unwrap_or("secret")
                        .to_ascii_lowercase();
                    format!("{}=[REDACTED]", key)
                })
                .to_string();
        }

        RedactionResult {
            content: result,
            redaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Redactor;

    #[test]
    fn redacts_json_token_fields() {
        let result = Redactor::new().redact(r#"{"access_token": "ya29.a0AfH6SMBxyz123456", "expires_in": 3599}"#);
        assert!(!result.content.contains("a0AfH6SMBxyz123456"));
        assert!(result.content.contains("access_token=[REDACTED]"));
        assert!(result.content.contains("expires_in"));
    }

    #[test]
    fn redacts_bare_google_tokens_and_secrets() {
        let result = Redactor::new().redact("revoke failed for ya29.abcdefghijklmnop with GOCSPX-abcdefghijkl");
        assert!(!result.content.contains("abcdefghijklmnop"));
        assert!(!result.content.contains("GOCSPX-abcdefghijkl"));
        assert!(result.redaction_count >= 2);
    }

    #[test]
    fn leaves_plain_text_alone() {
        let result = Redactor::new().redact("invalid_grant: Bad Request");
        assert_eq!(result.content, "invalid_grant: Bad Request");
        assert_eq!(result.redaction_count, 0);
    }
}
