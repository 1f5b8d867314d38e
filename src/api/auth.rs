use axum::http::HeaderMap;

/// Outcome of checking a request's API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    /// Key missing or wrong
    Denied,
    /// The server has no key configured and refuses every request
    NotConfigured,
}

#[derive(Clone, Debug)]
pub struct Auth {
    api_key: Option<String>,
}

impl Auth {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    pub fn check(&self, headers: &HeaderMap) -> AuthDecision {
        let Some(expected) = &self.api_key else {
            return AuthDecision::NotConfigured;
        };

        match extract_token(headers) {
            Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
                AuthDecision::Allowed
            }
            _ => AuthDecision::Denied,
        }
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-api-key") {
        return value.to_str().ok().map(|value| value.to_string());
    }

    let text = headers.get("authorization")?.to_str().ok()?;
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() == 2 && parts[0].eq_ignore_ascii_case("bearer") {
        return Some(parts[1].to_string());
    }

    None
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
