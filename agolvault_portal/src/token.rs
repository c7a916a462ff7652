use agolvault_core::time::Timestamp;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Short-lived session token. Acquired once at connect time and read-only
/// afterwards; there is no refresh path, expiry mid-run is fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: Timestamp,
}

impl Token {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use agolvault_core::time::Timestamp;

    use super::Token;

    fn ts(epoch_secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(epoch_secs).expect("valid epoch seconds")
    }

    #[test]
    fn token_expires_at_its_deadline() {
        let token = Token {
            value: "tok".to_owned(),
            expires_at: ts(1_000),
        };
        assert!(!token.is_expired(ts(999)));
        assert!(token.is_expired(ts(1_000)));
        assert!(token.is_expired(ts(1_001)));
    }
}
