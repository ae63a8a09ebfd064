//! Bearer-token gate for `POST /dashboard`.

/// Token used when `DASHBOARD_UPDATE_TOKEN` is unset. Insecure; deployments
/// must override it (or set `DASHBOARD_REQUIRE_TOKEN=1` to refuse to start).
pub const FALLBACK_TOKEN: &str = "REPLACE_ME_WITH_A_RANDOM_SECRET_STRING_32_CHARS_MINIMUM";

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct AuthGate {
    token: String,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").field("token", &"<redacted>").finish()
    }
}

impl AuthGate {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// `header` is the raw `Authorization` value, if any.
    pub fn authorized(&self, header: Option<&str>) -> bool {
        let Some(provided) = header.and_then(|h| h.strip_prefix(BEARER_PREFIX)) else {
            return false;
        };
        constant_time_eq(provided.trim().as_bytes(), self.token.as_bytes())
    }
}

/// Length is compared first; equal-length inputs are always scanned in full.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_token() {
        let gate = AuthGate::new("abc123");
        assert!(gate.authorized(Some("Bearer abc123")));
    }

    #[test]
    fn rejects_wrong_token_of_same_length() {
        let gate = AuthGate::new("abc123");
        assert!(!gate.authorized(Some("Bearer abc124")));
        assert!(!gate.authorized(Some("Bearer wrongt")));
        assert!(!gate.authorized(Some("Bearer wrongtoken")));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        let gate = AuthGate::new("abc123");
        assert!(!gate.authorized(None));
        assert!(!gate.authorized(Some("abc123")));
        assert!(!gate.authorized(Some("bearer abc123")));
        assert!(!gate.authorized(Some("Basic abc123")));
        assert!(!gate.authorized(Some("Bearer ")));
    }

    #[test]
    fn debug_output_hides_token() {
        let s = format!("{:?}", AuthGate::new("s3cret"));
        assert!(!s.contains("s3cret"));
    }
}
