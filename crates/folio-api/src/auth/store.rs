//! In-memory one-time code and session store.
//!
//! Codes are keyed by recipient identity (one live code per identity),
//! sessions by an opaque 64-hex-char bearer token. Expiry is checked lazily on
//! lookup; expired entries are evicted only when the same key is looked up
//! again.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::debug;

use folio_core::Clock;
use folio_core::config::OtpConfig;

/// Lowest and one-past-highest six-digit code.
const CODE_RANGE: std::ops::Range<u32> = 100_000..1_000_000;

/// Bytes of entropy behind a session token.
const TOKEN_BYTES: usize = 32;

/// Cryptographically strong random source usable behind a trait object.
pub trait SecureRng: RngCore + CryptoRng + Send {}

impl<R: RngCore + CryptoRng + Send> SecureRng for R {}

/// A freshly issued code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedOtp {
    pub code: String,
    /// Absolute expiry in Unix milliseconds.
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
struct OtpRecord {
    code: String,
    expires_at: i64,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    authenticated: bool,
    expires_at: i64,
}

/// Errors from redeeming a code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("No code on record")]
    NotFound,

    #[error("Code expired")]
    Expired,

    #[error("Code does not match")]
    Mismatch,
}

/// OTP and session store.
pub struct OtpStore {
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn SecureRng>>,
    otps: Mutex<HashMap<String, OtpRecord>>,
    sessions: Mutex<HashMap<String, SessionRecord>>,
    otp_ttl_ms: i64,
    session_ttl_ms: i64,
}

impl OtpStore {
    /// Create a store reading time from `clock` and drawing from the OS RNG.
    pub fn new(clock: Arc<dyn Clock>, config: OtpConfig) -> Self {
        Self::with_rng(clock, config, Box::new(OsRng))
    }

    /// Create a store with an explicit random source.
    pub fn with_rng(clock: Arc<dyn Clock>, config: OtpConfig, rng: Box<dyn SecureRng>) -> Self {
        Self {
            clock,
            rng: Mutex::new(rng),
            otps: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            otp_ttl_ms: millis(config.otp_ttl()),
            session_ttl_ms: millis(config.session_ttl()),
        }
    }

    /// Issue a new six-digit code for `identity`, replacing any previous one.
    pub async fn issue(&self, identity: &str) -> IssuedOtp {
        let code = self.rng.lock().await.gen_range(CODE_RANGE).to_string();
        let expires_at = self.clock.now_millis() + self.otp_ttl_ms;

        let replaced = self
            .otps
            .lock()
            .await
            .insert(
                identity.to_string(),
                OtpRecord {
                    code: code.clone(),
                    expires_at,
                },
            )
            .is_some();
        debug!(identity, replaced, expires_at, "Issued one-time code");

        IssuedOtp { code, expires_at }
    }

    /// Exchange a code for a session token.
    ///
    /// The code map stays locked from lookup to removal, so concurrent
    /// redeems of the same code are serialized and only one can succeed.
    pub async fn redeem(&self, identity: &str, supplied: &str) -> Result<String, OtpError> {
        let mut otps = self.otps.lock().await;
        let record = otps.get(identity).ok_or(OtpError::NotFound)?;

        let now = self.clock.now_millis();
        if now > record.expires_at {
            otps.remove(identity);
            return Err(OtpError::Expired);
        }

        if !bool::from(record.code.as_bytes().ct_eq(supplied.as_bytes())) {
            return Err(OtpError::Mismatch);
        }

        otps.remove(identity);
        let token = self.mint_token().await;
        self.sessions.lock().await.insert(
            token.clone(),
            SessionRecord {
                authenticated: true,
                expires_at: now + self.session_ttl_ms,
            },
        );
        drop(otps);

        debug!(identity, "Code redeemed, session opened");
        Ok(token)
    }

    /// Whether `token` names a live, authenticated session.
    pub async fn verify(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get(token) else {
            return false;
        };
        if self.clock.now_millis() > session.expires_at {
            sessions.remove(token);
            return false;
        }
        session.authenticated
    }

    async fn mint_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.lock().await.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn millis(duration: std::time::Duration) -> i64 {
    duration.as_millis() as i64
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use folio_core::clock::ManualClock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const ID: &str = "user@example.com";
    const T0: i64 = 1_700_000_000_000;

    fn setup() -> (OtpStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let store = OtpStore::with_rng(
            Arc::clone(&clock) as Arc<dyn Clock>,
            OtpConfig::default(),
            Box::new(StdRng::seed_from_u64(7)),
        );
        (store, clock)
    }

    fn wrong(code: &str) -> String {
        let first = if code.starts_with('9') { '1' } else { '9' };
        format!("{first}{}", &code[1..])
    }

    #[tokio::test]
    async fn issued_code_is_six_digits_with_ten_minute_expiry() {
        let (store, _clock) = setup();
        let issued = store.issue(ID).await;
        assert_eq!(issued.code.len(), 6);
        assert!(issued.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(issued.expires_at, T0 + 600_000);
    }

    #[tokio::test]
    async fn redeem_is_one_time() {
        let (store, _clock) = setup();
        let issued = store.issue(ID).await;

        let token = store.redeem(ID, &issued.code).await.unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(
            store.redeem(ID, &issued.code).await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test]
    async fn redeem_without_issue_is_not_found() {
        let (store, _clock) = setup();
        assert_eq!(store.redeem(ID, "123456").await, Err(OtpError::NotFound));
    }

    #[tokio::test]
    async fn expired_code_is_evicted() {
        let (store, clock) = setup();
        let issued = store.issue(ID).await;
        clock.advance(Duration::from_secs(600) + Duration::from_millis(1));

        assert_eq!(store.redeem(ID, &issued.code).await, Err(OtpError::Expired));
        assert_eq!(
            store.redeem(ID, &issued.code).await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test]
    async fn code_is_valid_at_exact_expiry() {
        let (store, clock) = setup();
        let issued = store.issue(ID).await;
        clock.set(issued.expires_at);
        assert!(store.redeem(ID, &issued.code).await.is_ok());
    }

    #[tokio::test]
    async fn mismatch_keeps_the_record() {
        let (store, _clock) = setup();
        let issued = store.issue(ID).await;

        assert_eq!(
            store.redeem(ID, &wrong(&issued.code)).await,
            Err(OtpError::Mismatch)
        );
        assert_eq!(store.redeem(ID, "").await, Err(OtpError::Mismatch));
        assert!(store.redeem(ID, &issued.code).await.is_ok());
    }

    #[tokio::test]
    async fn reissue_overwrites_previous_code() {
        let (store, _clock) = setup();
        let first = store.issue(ID).await;
        let mut second = store.issue(ID).await;
        while second.code == first.code {
            second = store.issue(ID).await;
        }

        assert_eq!(store.redeem(ID, &first.code).await, Err(OtpError::Mismatch));
        assert!(store.redeem(ID, &second.code).await.is_ok());
    }

    #[tokio::test]
    async fn codes_are_per_identity() {
        let (store, _clock) = setup();
        let issued = store.issue(ID).await;
        assert_eq!(
            store.redeem("other@example.com", &issued.code).await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test]
    async fn session_lives_for_a_day() {
        let (store, clock) = setup();
        let issued = store.issue(ID).await;
        let token = store.redeem(ID, &issued.code).await.unwrap();

        assert!(store.verify(&token).await);
        clock.advance(Duration::from_secs(24 * 60 * 60 - 1));
        assert!(store.verify(&token).await);
        assert!(store.verify(&token).await, "tokens are reusable");

        clock.advance(Duration::from_secs(2));
        assert!(!store.verify(&token).await);

        // Never revalidates, even if the clock moves backwards.
        clock.set(T0);
        assert!(!store.verify(&token).await);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let (store, _clock) = setup();
        assert!(!store.verify("deadbeef").await);
        assert!(!store.verify("").await);
    }

    #[tokio::test]
    async fn each_redeem_mints_a_distinct_token() {
        let (store, _clock) = setup();
        let a = store.issue(ID).await;
        let t1 = store.redeem(ID, &a.code).await.unwrap();
        let b = store.issue(ID).await;
        let t2 = store.redeem(ID, &b.code).await.unwrap();
        assert_ne!(t1, t2);
        assert!(store.verify(&t1).await);
        assert!(store.verify(&t2).await);
    }

    #[tokio::test]
    async fn concurrent_redeems_succeed_once() {
        let (store, _clock) = setup();
        let store = Arc::new(store);
        let issued = store.issue(ID).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let code = issued.code.clone();
                tokio::spawn(async move { store.redeem(ID, &code).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
