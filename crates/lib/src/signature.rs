//! Request signing: HMAC-SHA256 over `v0:{timestamp}:{body}` with a five minute replay window.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Requests whose timestamp is further than this from now are rejected as replays.
pub const REPLAY_WINDOW_SECS: i64 = 300;

const VERSION_PREFIX: &str = "v0";

/// Signature headers as received (either may be absent).
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureHeaders<'a> {
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

/// Why a request failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// One or both headers missing while verification is required.
    MissingHeaders,
    /// Headers present but no signing secret configured.
    NoSecret,
    /// Timestamp unparseable or outside the replay window.
    Stale,
    Mismatch,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingHeaders => "missing_headers",
            RejectReason::NoSecret => "no_signing_secret",
            RejectReason::Stale => "stale_timestamp",
            RejectReason::Mismatch => "signature_mismatch",
        }
    }
}

/// Outcome of checking an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Verified,
    /// Both headers absent and signatures are not required (local testing).
    Skipped,
    Rejected(RejectReason),
}

/// Compute the `v0=` signature for a body at a given timestamp.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(VERSION_PREFIX.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("{}={}", VERSION_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

fn within_window(timestamp: &str, now: i64) -> bool {
    match timestamp.trim().parse::<i64>() {
        Ok(ts) => (now - ts).abs() <= REPLAY_WINDOW_SECS,
        Err(_) => false,
    }
}

/// Verify a signature. `now` is unix seconds.
pub fn verify(secret: &str, body: &[u8], timestamp: &str, signature: &str, now: i64) -> bool {
    if !within_window(timestamp, now) {
        return false;
    }
    let expected = sign(secret, timestamp, body);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Apply the verification policy to a request.
///
/// A request missing either header is let through unverified unless `require` is set.
pub fn check(
    secret: Option<&str>,
    headers: SignatureHeaders<'_>,
    body: &[u8],
    require: bool,
    now: i64,
) -> SignatureCheck {
    let (timestamp, signature) = match (headers.timestamp, headers.signature) {
        (Some(t), Some(s)) => (t, s),
        _ if require => return SignatureCheck::Rejected(RejectReason::MissingHeaders),
        _ => return SignatureCheck::Skipped,
    };
    let Some(secret) = secret else {
        return SignatureCheck::Rejected(RejectReason::NoSecret);
    };
    if !within_window(timestamp, now) {
        return SignatureCheck::Rejected(RejectReason::Stale);
    }
    if verify(secret, body, timestamp, signature, now) {
        SignatureCheck::Verified
    } else {
        SignatureCheck::Rejected(RejectReason::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    #[test]
    fn signature_has_version_prefix_and_hex_digest() {
        let sig = sign(SECRET, "1531420618", b"token=abc");
        assert!(sig.starts_with("v0="));
        assert_eq!(sig.len(), 3 + 64);
        assert!(sig[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sign_then_verify_within_window() {
        let ts = NOW.to_string();
        let body = br#"{"type":"event_callback"}"#;
        let sig = sign(SECRET, &ts, body);
        assert!(verify(SECRET, body, &ts, &sig, NOW));
        assert!(verify(SECRET, body, &ts, &sig, NOW + REPLAY_WINDOW_SECS));
        assert!(verify(SECRET, body, &ts, &sig, NOW - REPLAY_WINDOW_SECS));
    }

    #[test]
    fn any_flipped_body_byte_fails() {
        let ts = NOW.to_string();
        let body = b"payload=hello world".to_vec();
        let sig = sign(SECRET, &ts, &body);
        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert!(!verify(SECRET, &tampered, &ts, &sig, NOW), "byte {} flipped", i);
        }
    }

    #[test]
    fn outside_replay_window_fails_even_with_correct_signature() {
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, b"x");
        assert!(!verify(SECRET, b"x", &ts, &sig, NOW + REPLAY_WINDOW_SECS + 1));
        assert!(!verify(SECRET, b"x", &ts, &sig, NOW - REPLAY_WINDOW_SECS - 1));
    }

    #[test]
    fn wrong_secret_or_garbage_timestamp_fails() {
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, b"x");
        assert!(!verify("other", b"x", &ts, &sig, NOW));
        assert!(!verify(SECRET, b"x", "not-a-number", &sig, NOW));
    }

    #[test]
    fn check_skips_unsigned_requests_unless_required() {
        let none = SignatureHeaders::default();
        assert_eq!(check(Some(SECRET), none, b"x", false, NOW), SignatureCheck::Skipped);
        assert_eq!(
            check(Some(SECRET), none, b"x", true, NOW),
            SignatureCheck::Rejected(RejectReason::MissingHeaders)
        );
    }

    #[test]
    fn check_skips_single_header_unless_required() {
        let ts = NOW.to_string();
        let half = SignatureHeaders {
            timestamp: Some(&ts),
            signature: None,
        };
        assert_eq!(check(Some(SECRET), half, b"x", false, NOW), SignatureCheck::Skipped);
        assert_eq!(
            check(Some(SECRET), half, b"x", true, NOW),
            SignatureCheck::Rejected(RejectReason::MissingHeaders)
        );
        let sig_only = SignatureHeaders {
            timestamp: None,
            signature: Some("v0=deadbeef"),
        };
        assert_eq!(check(Some(SECRET), sig_only, b"x", false, NOW), SignatureCheck::Skipped);
    }

    #[test]
    fn check_rejects_missing_secret_and_bad_signatures() {
        let ts = NOW.to_string();

        let sig = sign(SECRET, &ts, b"x");
        let both = SignatureHeaders {
            timestamp: Some(&ts),
            signature: Some(&sig),
        };
        assert_eq!(
            check(None, both, b"x", false, NOW),
            SignatureCheck::Rejected(RejectReason::NoSecret)
        );
        assert_eq!(check(Some(SECRET), both, b"x", false, NOW), SignatureCheck::Verified);
        assert_eq!(
            check(Some(SECRET), both, b"y", false, NOW),
            SignatureCheck::Rejected(RejectReason::Mismatch)
        );
        assert_eq!(
            check(Some(SECRET), both, b"x", false, NOW + 301),
            SignatureCheck::Rejected(RejectReason::Stale)
        );
    }
}
