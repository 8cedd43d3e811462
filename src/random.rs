use rand::Rng;
use rand::distr::Alphanumeric;

const TOKEN_LEN: usize = 24;

/// Generates a cryptographically random `state` parameter for `OAuth2`.
///
/// Returns a 24-character alphanumeric string from the thread-local CSPRNG.
#[must_use]
pub fn generate_state() -> String {
    alphanumeric_token(TOKEN_LEN)
}

/// Generates a cryptographically random `nonce` for OpenID Connect.
///
/// Returns a 24-character alphanumeric string from the thread-local CSPRNG.
#[must_use]
pub fn generate_nonce() -> String {
    alphanumeric_token(TOKEN_LEN)
}

fn alphanumeric_token(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_length() {
        let state = generate_state();
        assert_eq!(state.len(), 24);
    }

    #[test]
    fn test_state_alphanumeric() {
        let state = generate_state();
        assert!(
            state.chars().all(|c| c.is_ascii_alphanumeric()),
            "state should be alphanumeric: {}",
            state
        );
    }

    #[test]
    fn test_state_uniqueness() {
        let s1 = generate_state();
        let s2 = generate_state();
        assert_ne!(s1, s2, "states should be unique");
    }

    #[test]
    fn test_nonce_length() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 24);
    }

    #[test]
    fn test_nonce_uniqueness() {
        let n1 = generate_nonce();
        let n2 = generate_nonce();
        assert_ne!(n1, n2, "nonces should be unique");
    }
}
