//! Session identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum allowed session id length (256 characters).
///
/// Prevents DoS via extremely long session ids and bounds store memory use.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Unique identifier for an MCP session (spec §3: "recommended UUIDv4").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new cryptographically random session id.
    ///
    /// Uses 128 bits of CSPRNG entropy, formatted as `mcp-<hex>`.
    ///
    /// # Panics
    ///
    /// Panics if the OS CSPRNG is unavailable. This is fail-closed by
    /// design: a weak or predictable session id is a session-hijacking
    /// vector, so we refuse to emit one rather than degrade silently. Use
    /// [`SessionId::try_new`] to handle RNG failure explicitly.
    pub fn new() -> Self {
        Self::try_new().expect("OS CSPRNG unavailable; cannot mint a secure session id")
    }

    /// Fallible version of [`SessionId::new`].
    pub fn try_new() -> Option<Self> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).ok()?;
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Some(Self(format!("mcp-{hex}")))
    }

    /// Accept a client- or store-provided session id string as-is.
    ///
    /// Per spec §9 open question, stateless mode accepts any client-minted
    /// `Mcp-Session-Id` value without further validation beyond the length
    /// bound enforced here.
    pub fn try_from_str(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        (!s.is_empty() && s.len() <= MAX_SESSION_ID_LEN).then_some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert!(a.as_str().starts_with("mcp-"));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_oversized_ids() {
        let too_long = "a".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::try_from_str(too_long).is_none());
    }

    #[test]
    fn rejects_empty_id() {
        assert!(SessionId::try_from_str("").is_none());
    }

    #[test]
    fn accepts_arbitrary_client_minted_id() {
        // Spec §9 open question: stateless mode must accept this unchanged.
        assert!(SessionId::try_from_str("client-chosen-id").is_some());
    }
}
