//! Origin header validation — DNS-rebinding defense (spec §4.1.2).

/// Validate an `Origin` header against the allow-list.
///
/// Per spec §4.1.2: if `Origin` is absent, accept (no DNS rebinding is
/// possible without an `Origin` claim to rebind). Otherwise accept iff it
/// exactly equals an allow-list entry or begins with `entry + ":"` (a port
/// suffix). `allow_any_origin` short-circuits to accept everything.
pub fn validate_origin(
    origin: Option<&str>,
    allowed_origins: &[String],
    allow_any_origin: bool,
) -> bool {
    if allow_any_origin {
        return true;
    }

    let Some(origin) = origin else {
        return true;
    };

    allowed_origins
        .iter()
        .any(|entry| origin == entry || origin.starts_with(&format!("{entry}:")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_origins() -> Vec<String> {
        vec![
            "http://localhost".to_string(),
            "https://localhost".to_string(),
            "http://127.0.0.1".to_string(),
            "https://127.0.0.1".to_string(),
        ]
    }

    #[test]
    fn missing_origin_is_accepted() {
        assert!(validate_origin(None, &default_origins(), false));
    }

    #[test]
    fn exact_match_is_accepted() {
        assert!(validate_origin(
            Some("http://localhost"),
            &default_origins(),
            false
        ));
    }

    #[test]
    fn port_suffixed_origin_is_accepted() {
        assert!(validate_origin(
            Some("http://localhost:3000"),
            &default_origins(),
            false
        ));
    }

    #[test]
    fn unrelated_origin_is_rejected() {
        assert!(!validate_origin(
            Some("https://evil.example"),
            &default_origins(),
            false
        ));
    }

    #[test]
    fn prefix_without_colon_is_rejected() {
        // "http://localhost.evil.example" must not be accepted just because
        // it starts with the allow-listed string.
        assert!(!validate_origin(
            Some("http://localhost.evil.example"),
            &default_origins(),
            false
        ));
    }

    #[test]
    fn wildcard_allows_everything() {
        assert!(validate_origin(Some("https://evil.example"), &[], true));
    }
}
