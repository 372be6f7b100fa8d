use super::error::AuthError;
use super::store::SessionStore;
use crate::persistence::{Credential, ReportRepository, User, UserStore};
use crate::shared::clock::now_secs;
use crate::shared::{EventLog, UserId};
use getrandom::getrandom;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::sync::Arc;

const MIN_PASSWORD_LEN: usize = 6;
const SALT_BYTES: usize = 16;
const PBKDF2_ITERATIONS: u32 = 100_000;
const HASH_BYTES: usize = 32;

/// Identity confirmed by an auth provider. Profiles live in [`UserStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: UserId,
    pub email: String,
}

pub trait AuthProvider {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;
}

/// Password auth against the `credentials` table. Passwords are stored as a
/// hex PBKDF2-HMAC-SHA256 key derived with a per-credential random salt.
#[derive(Debug, Clone)]
pub struct LocalAuthProvider {
    repository: ReportRepository,
}

impl LocalAuthProvider {
    pub fn new(repository: ReportRepository) -> Self {
        Self { repository }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        if self.repository.find_credential_by_email(email)?.is_some() {
            return Err(AuthError::EmailTaken {
                email: email.to_string(),
            });
        }
        let user_id = UserId::generate(now_secs()).map_err(AuthError::Provider)?;
        let password_salt = generate_salt()?;
        let password_hash = hash_password(&password_salt, password);
        self.repository.insert_credential(&Credential {
            user_id: user_id.clone(),
            email: email.to_string(),
            password_salt,
            password_hash,
        })?;
        Ok(AuthIdentity {
            user_id,
            email: email.to_string(),
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let credential = self
            .repository
            .find_credential_by_email(email)?
            .ok_or(AuthError::InvalidCredentials)?;
        let candidate = hash_password(&credential.password_salt, password);
        if !constant_time_eq(candidate.as_bytes(), credential.password_hash.as_bytes()) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(AuthIdentity {
            user_id: credential.user_id,
            email: credential.email,
        })
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

fn generate_salt() -> Result<String, AuthError> {
    let mut bytes = [0_u8; SALT_BYTES];
    getrandom(&mut bytes)
        .map_err(|err| AuthError::Provider(format!("failed to generate salt: {err}")))?;
    Ok(to_hex(&bytes))
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut derived = [0_u8; HASH_BYTES];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut derived,
    );
    to_hex(&derived)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (l, r)| acc | (l ^ r))
        == 0
}

/// Login, signup and session checks. Sign-in state is published through the
/// shared [`SessionStore`].
pub struct AuthService<P, U> {
    provider: P,
    users: U,
    session: Arc<SessionStore>,
    log: EventLog,
}

impl<P: AuthProvider, U: UserStore> AuthService<P, U> {
    pub fn new(provider: P, users: U, session: Arc<SessionStore>, log: EventLog) -> Self {
        Self {
            provider,
            users,
            session,
            log,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Authenticates, loads the profile (creating it with `organization`
    /// when absent) and signs the session in. Any failure leaves the
    /// session signed out.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        organization: &str,
    ) -> Result<User, AuthError> {
        let email = email.trim();
        match self.try_login(email, password, organization) {
            Ok(user) => {
                self.log
                    .info("auth.login", &format!("user {} signed in", user.id));
                Ok(user)
            }
            Err(err) => {
                let _ = self.provider.sign_out();
                let _ = self.session.sign_out();
                self.log
                    .warn("auth.login_failed", &format!("{email}: {err}"));
                Err(err)
            }
        }
    }

    fn try_login(
        &self,
        email: &str,
        password: &str,
        organization: &str,
    ) -> Result<User, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "email and password are required".to_string(),
            ));
        }
        let identity = self.provider.sign_in(email, password)?;
        let user = match self.users.get_user(&identity.user_id)? {
            Some(profile) => profile,
            None => {
                let organization = organization.trim();
                if organization.is_empty() {
                    return Err(AuthError::Validation(
                        "organization name is required to create a profile".to_string(),
                    ));
                }
                let profile = User {
                    id: identity.user_id,
                    email: identity.email,
                    organization_name: organization.to_string(),
                    created_at: now_secs(),
                };
                self.users.insert_user(&profile)?;
                profile
            }
        };
        self.session.sign_in(user.clone())?;
        Ok(user)
    }

    /// Creates credentials and a profile. The session is left untouched.
    pub fn signup(
        &self,
        email: &str,
        password: &str,
        organization: &str,
    ) -> Result<User, AuthError> {
        let email = email.trim();
        let organization = organization.trim();
        validate_signup(email, password, organization)?;

        let identity = self.provider.sign_up(email, password)?;
        let user = User {
            id: identity.user_id,
            email: identity.email,
            organization_name: organization.to_string(),
            created_at: now_secs(),
        };
        self.users.insert_user(&user)?;
        self.log
            .info("auth.signup", &format!("user {} registered", user.id));
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.provider.sign_out()?;
        self.session.sign_out()?;
        self.log.info("auth.logout", "session cleared");
        Ok(())
    }

    /// Revalidates the current session against the stored profile. A
    /// session whose profile is gone is signed out.
    pub fn check_auth(&self) -> Result<Option<User>, AuthError> {
        let Some(current) = self.session.current_user() else {
            return Ok(None);
        };
        match self.users.get_user(&current.id)? {
            Some(profile) => {
                if profile != current {
                    self.session.sign_in(profile.clone())?;
                }
                Ok(Some(profile))
            }
            None => {
                self.session.sign_out()?;
                self.log.warn(
                    "auth.session_dropped",
                    &format!("profile {} no longer exists", current.id),
                );
                Ok(None)
            }
        }
    }
}

fn validate_signup(email: &str, password: &str, organization: &str) -> Result<(), AuthError> {
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation(format!(
            "`{email}` is not a valid email address"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if organization.is_empty() {
        return Err(AuthError::Validation(
            "organization name is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    #[test]
    fn password_hash_depends_on_salt() {
        let first = hash_password("aa", "secret1");
        let second = hash_password("bb", "secret1");
        assert_ne!(first, second);
        assert_eq!(first.len(), HASH_BYTES * 2);
        assert_eq!(first, hash_password("aa", "secret1"));
        assert_ne!(first, hash_password("aa", "secret2"));
    }

    #[test]
    fn password_hash_is_a_stretched_key_not_a_single_digest() {
        let single_pass = {
            let mut hasher = Sha256::new();
            hasher.update(b"aa:secret1");
            to_hex(&hasher.finalize())
        };
        assert_ne!(hash_password("aa", "secret1"), single_pass);
    }

    #[test]
    fn signup_validation_rejects_short_passwords() {
        let err = validate_signup("a@b.co", "123", "Acme").expect_err("short");
        assert!(err.to_string().contains("at least 6"));
        assert!(validate_signup("nope", "123456", "Acme").is_err());
        assert!(validate_signup("a@b.co", "123456", " ").is_err());
        assert!(validate_signup("a@b.co", "123456", "Acme").is_ok());
    }

    #[test]
    fn constant_time_eq_matches_plain_equality() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
