//! Admin session management
//!
//! Admins log in with a single configured username/password pair. A
//! successful login mints a session token and stores it in the
//! `admin_session` cookie; every privileged request re-verifies it.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::error::{ConfigError, ConfigResult};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AdminConfig;
use crate::jwt::{SessionClaims, SessionError, SessionTokens, SessionVerdict};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "admin_session";

/// Configured admin credentials, with the password held as an Argon2 hash
pub struct AdminCredentials {
    username: String,
    password_hash: Option<String>,
}

impl AdminCredentials {
    /// Build credentials from configuration, hashing a plaintext password
    pub fn from_config(config: &AdminConfig) -> ConfigResult<Self> {
        let password_hash = match (&config.password_hash, &config.password) {
            (Some(hash), _) if !hash.trim().is_empty() => {
                PasswordHash::new(hash.trim()).map_err(|e| ConfigError::Invalid {
                    key: "admin.password_hash".to_string(),
                    reason: e.to_string(),
                })?;
                Some(hash.trim().to_string())
            }
            (_, Some(password)) if !password.is_empty() => Some(hash_password(password)?),
            _ => {
                warn!("Admin password is not configured, admin login is disabled");
                None
            }
        };

        Ok(Self {
            username: config.username.clone(),
            password_hash,
        })
    }

    /// Check a username/password pair
    ///
    /// The password hash is always checked when one is configured, so a wrong
    /// username costs the same as a wrong password.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let Some(stored) = &self.password_hash else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };

        let password_ok = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
        let username_ok = username == self.username;

        password_ok && username_ok
    }
}

fn hash_password(password: &str) -> ConfigResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::Invalid {
            key: "admin.password".to_string(),
            reason: format!("Failed to hash password: {}", e),
        })
}

/// Outcome of a login attempt
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials matched; the jar carries the new session cookie
    Authenticated { jar: CookieJar, claims: SessionClaims },
    /// Credentials did not match or no password is configured
    Rejected,
}

/// Admin login, verification and logout
#[derive(Clone)]
pub struct AdminSession {
    credentials: Arc<AdminCredentials>,
    tokens: SessionTokens,
    secure_cookie: bool,
}

impl AdminSession {
    /// Create a new admin session manager
    pub fn new(credentials: AdminCredentials, tokens: SessionTokens, secure_cookie: bool) -> Self {
        Self {
            credentials: Arc::new(credentials),
            tokens,
            secure_cookie,
        }
    }

    /// Check credentials and, on success, add a fresh session cookie to the jar
    pub fn login(
        &self,
        jar: CookieJar,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, SessionError> {
        if !self.credentials.verify(username, password) {
            warn!("Rejected admin login attempt");
            return Ok(LoginOutcome::Rejected);
        }

        let (token, claims) = self.tokens.issue()?;
        info!("Admin session issued, expires at {}", claims.exp);

        Ok(LoginOutcome::Authenticated {
            jar: jar.add(self.session_cookie(token)),
            claims,
        })
    }

    /// Verify the session cookie carried by a request
    pub fn verify(&self, jar: &CookieJar) -> SessionVerdict {
        match jar.get(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => self.tokens.verify(cookie.value()),
            _ => SessionVerdict::Missing,
        }
    }

    /// Remove the session cookie
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(self.tokens.ttl().num_seconds()))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SecretSource, SigningSecret};
    use chrono::Duration;
    use common::ManualClock;

    fn admin_config(password: Option<&str>) -> AdminConfig {
        AdminConfig {
            password: password.map(str::to_string),
            ..AdminConfig::default()
        }
    }

    fn session(password: Option<&str>, clock: &ManualClock) -> AdminSession {
        let credentials = AdminCredentials::from_config(&admin_config(password)).unwrap();
        let secret = SigningSecret::new("session-test-secret-0123456789abcdef", SecretSource::Dedicated);
        let tokens = SessionTokens::new(&secret, Duration::days(7), Arc::new(clock.clone()));
        AdminSession::new(credentials, tokens, false)
    }

    /// Turn the cookies a response would set into the jar of a follow-up request
    fn next_request_jar(jar: &CookieJar) -> CookieJar {
        let mut next = CookieJar::new();
        for cookie in jar.iter() {
            next = next.add(Cookie::new(cookie.name().to_string(), cookie.value().to_string()));
        }
        next
    }

    #[test]
    fn test_login_then_verify() {
        let clock = ManualClock::default();
        let session = session(Some("correct horse"), &clock);

        let outcome = session
            .login(CookieJar::new(), "admin", "correct horse")
            .unwrap();
        let LoginOutcome::Authenticated { jar, .. } = outcome else {
            panic!("expected successful login");
        };

        let cookie = jar.get(SESSION_COOKIE).expect("session cookie set");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));

        assert!(session.verify(&next_request_jar(&jar)).is_authenticated());
    }

    #[test]
    fn test_wrong_password_and_unknown_user_look_the_same() {
        let clock = ManualClock::default();
        let session = session(Some("correct horse"), &clock);

        let wrong_password = session.login(CookieJar::new(), "admin", "wrong").unwrap();
        let unknown_user = session
            .login(CookieJar::new(), "root", "correct horse")
            .unwrap();

        assert!(matches!(wrong_password, LoginOutcome::Rejected));
        assert!(matches!(unknown_user, LoginOutcome::Rejected));
    }

    #[test]
    fn test_unconfigured_password_always_rejects() {
        let clock = ManualClock::default();
        let session = session(None, &clock);

        assert!(matches!(
            session.login(CookieJar::new(), "admin", "").unwrap(),
            LoginOutcome::Rejected
        ));
    }

    #[test]
    fn test_missing_cookie() {
        let clock = ManualClock::default();
        let session = session(Some("pw"), &clock);

        assert_eq!(session.verify(&CookieJar::new()), SessionVerdict::Missing);
    }

    #[test]
    fn test_session_expires_after_seven_days() {
        let clock = ManualClock::default();
        let session = session(Some("pw"), &clock);
        let LoginOutcome::Authenticated { jar, .. } =
            session.login(CookieJar::new(), "admin", "pw").unwrap()
        else {
            panic!("expected successful login");
        };
        let request_jar = next_request_jar(&jar);

        clock.advance(Duration::days(7));

        assert_eq!(session.verify(&request_jar), SessionVerdict::Expired);
    }

    #[test]
    fn test_prehashed_password() {
        let hash = hash_password("from-a-hash").unwrap();
        let config = AdminConfig {
            password_hash: Some(hash),
            password: Some("ignored".to_string()),
            ..AdminConfig::default()
        };

        let credentials = AdminCredentials::from_config(&config).unwrap();

        assert!(credentials.verify("admin", "from-a-hash"));
        assert!(!credentials.verify("admin", "ignored"));
    }

    #[test]
    fn test_invalid_hash_is_a_config_error() {
        let config = AdminConfig {
            password_hash: Some("not-a-phc-string".to_string()),
            ..AdminConfig::default()
        };

        assert!(AdminCredentials::from_config(&config).is_err());
    }
}
