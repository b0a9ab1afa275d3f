//! Session token codec.
//!
//! A token is the text `session_<userId>_<issuedAtMillis>_<nonce>`:
//!
//! ```text
//! session_u42_1718000000000_k3j9x0a7q
//! ───┬─── ─┬─ ──────┬────── ────┬────
//! prefix  user   issued at     nonce
//! ```
//!
//! The token is a liveness marker, not a credential. The nonce only breaks
//! ties between tokens issued for the same user in the same millisecond
//! and comes from a non-cryptographic source.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use ticketdesk_model::UserId;

use crate::{SessionError, TokenError};

/// Literal first segment of every token.
pub const TOKEN_PREFIX: &str = "session";

/// Segment delimiter. User ids containing it can't be encoded.
pub const DELIMITER: char = '_';

const NONCE_LEN: usize = 9;
const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A parsed session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: UserId,
    /// Epoch milliseconds at issue time.
    pub issued_at_millis: i64,
    pub nonce: String,
}

impl SessionToken {
    /// Issues a fresh token for `user_id` at `now_millis`, drawing the
    /// nonce from the thread-local RNG.
    ///
    /// # Errors
    /// [`SessionError::InvalidUserId`] if the id is empty or contains `_`.
    pub fn issue(user_id: &UserId, now_millis: i64) -> Result<Self, SessionError> {
        Self::issue_with_rng(user_id, now_millis, &mut rand::rng())
    }

    /// Like [`issue`](Self::issue) but with a caller-supplied RNG, so tests
    /// can pin the nonce.
    pub fn issue_with_rng<R: Rng + ?Sized>(
        user_id: &UserId,
        now_millis: i64,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let id = user_id.as_str();
        if id.is_empty() || id.contains(DELIMITER) {
            return Err(SessionError::InvalidUserId(id.to_string()));
        }

        let nonce = (0..NONCE_LEN)
            .map(|_| NONCE_ALPHABET[rng.random_range(0..NONCE_ALPHABET.len())] as char)
            .collect();

        Ok(Self {
            user_id: user_id.clone(),
            issued_at_millis: now_millis,
            nonce,
        })
    }

    /// Parses the textual form.
    ///
    /// # Errors
    /// A [`TokenError`] describing the first rule the text breaks.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = raw.split(DELIMITER).collect();
        let [prefix, user_id, issued_at, nonce] = segments.as_slice() else {
            return Err(TokenError::WrongSegmentCount(segments.len()));
        };

        if *prefix != TOKEN_PREFIX {
            return Err(TokenError::BadPrefix((*prefix).to_string()));
        }
        if user_id.is_empty() {
            return Err(TokenError::EmptyUserId);
        }
        if nonce.is_empty() {
            return Err(TokenError::EmptyNonce);
        }
        let issued_at_millis = issued_at
            .parse::<i64>()
            .map_err(|_| TokenError::BadTimestamp((*issued_at).to_string()))?;

        Ok(Self {
            user_id: UserId::from(*user_id),
            issued_at_millis,
            nonce: (*nonce).to_string(),
        })
    }

    /// The textual form stored in the key-value store.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Epoch milliseconds at which a token with this lifetime expires.
    pub fn expires_at_millis(&self, lifetime: Duration) -> i64 {
        self.issued_at_millis.saturating_add(duration_millis(lifetime))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TOKEN_PREFIX}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            self.user_id, self.issued_at_millis, self.nonce
        )
    }
}

impl FromStr for SessionToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whole milliseconds in `d`, saturating at `i64::MAX`.
pub(crate) fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn uid(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn test_issue_encodes_four_segments() {
        let token = SessionToken::issue(&uid("u42"), 1_718_000_000_000).unwrap();
        let text = token.encode();

        let parts: Vec<&str> = text.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "session");
        assert_eq!(parts[1], "u42");
        assert_eq!(parts[2], "1718000000000");
        assert_eq!(parts[3].len(), NONCE_LEN);
    }

    #[test]
    fn test_issue_nonce_is_lowercase_base36() {
        let token = SessionToken::issue(&uid("u1"), 0).unwrap();
        assert!(
            token
                .nonce
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_issue_with_same_seed_is_deterministic() {
        let a = SessionToken::issue_with_rng(&uid("u1"), 5, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = SessionToken::issue_with_rng(&uid("u1"), 5, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_issue_rejects_underscore_user_id() {
        let result = SessionToken::issue(&uid("user_1"), 0);
        assert!(matches!(result, Err(SessionError::InvalidUserId(id)) if id == "user_1"));
    }

    #[test]
    fn test_issue_rejects_empty_user_id() {
        assert!(matches!(
            SessionToken::issue(&uid(""), 0),
            Err(SessionError::InvalidUserId(_))
        ));
    }

    #[test]
    fn test_parse_recovers_issued_fields() {
        let issued = SessionToken::issue(&uid("alice"), 1_234).unwrap();

        let parsed = SessionToken::parse(&issued.encode()).unwrap();

        assert_eq!(parsed, issued);
    }

    #[test]
    fn test_parse_accepts_handwritten_token() {
        let token: SessionToken = "session_u7_42_abc".parse().unwrap();
        assert_eq!(token.user_id, uid("u7"));
        assert_eq!(token.issued_at_millis, 42);
        assert_eq!(token.nonce, "abc");
    }

    #[test]
    fn test_parse_empty_string_is_wrong_segment_count() {
        assert_eq!(
            SessionToken::parse(""),
            Err(TokenError::WrongSegmentCount(1))
        );
    }

    #[test]
    fn test_parse_two_segments_rejected() {
        assert_eq!(
            SessionToken::parse("session_abc"),
            Err(TokenError::WrongSegmentCount(2))
        );
    }

    #[test]
    fn test_parse_five_segments_rejected() {
        assert_eq!(
            SessionToken::parse("session_a_b_1_x"),
            Err(TokenError::WrongSegmentCount(5))
        );
    }

    #[test]
    fn test_parse_wrong_prefix_rejected() {
        assert_eq!(
            SessionToken::parse("notasession_1_2_3"),
            Err(TokenError::BadPrefix("notasession".into()))
        );
    }

    #[test]
    fn test_parse_non_numeric_timestamp_rejected() {
        assert_eq!(
            SessionToken::parse("session_u1_soon_abc"),
            Err(TokenError::BadTimestamp("soon".into()))
        );
    }

    #[test]
    fn test_parse_fractional_timestamp_rejected() {
        assert!(matches!(
            SessionToken::parse("session_u1_1.5_abc"),
            Err(TokenError::BadTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_empty_segments_rejected() {
        assert_eq!(SessionToken::parse("session__1_abc"), Err(TokenError::EmptyUserId));
        assert_eq!(SessionToken::parse("session_u1_1_"), Err(TokenError::EmptyNonce));
    }

    #[test]
    fn test_expires_at_adds_lifetime() {
        let token = SessionToken::parse("session_u1_1000_abc").unwrap();
        assert_eq!(token.expires_at_millis(Duration::from_secs(2)), 3_000);
    }
}
