//! Demo sign-in against the tenant's sample users.

use crate::domain::models::{User, UserRole};
use crate::error::AppError;
use crate::tenant::Tenant;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid login or password")]
    InvalidCredentials,
    #[error("failed to hash password: {0}")]
    Hash(String),
}

struct Account {
    user_id: String,
    email: String,
    role: UserRole,
    hash: String,
}

pub struct AuthService {
    accounts: Vec<Account>,
}

impl AuthService {
    /// Hashes every sample password once at startup.
    pub fn from_tenant(tenant: &Tenant) -> Result<Self, AuthError> {
        let argon = Argon2::default();
        let accounts = tenant
            .sample_users
            .iter()
            .map(|user| {
                let salt = SaltString::generate(rand_core::OsRng);
                let hash = argon
                    .hash_password(user.password.as_bytes(), &salt)
                    .map_err(|e| AuthError::Hash(e.to_string()))?
                    .to_string();
                Ok(Account {
                    user_id: user.id.clone(),
                    email: user.email.clone(),
                    role: user.role,
                    hash,
                })
            })
            .collect::<Result<Vec<_>, AuthError>>()?;

        tracing::info!("Prepared {} demo accounts for tenant {}", accounts.len(), tenant.id);
        Ok(Self { accounts })
    }

    /// Matches `login` against account ids and emails, then checks the
    /// password. Returns the user id.
    pub fn login(&self, login: &str, password: &str) -> Result<&str, AuthError> {
        let login = login.trim();
        let account = self
            .accounts
            .iter()
            .find(|account| account.user_id == login || account.email.eq_ignore_ascii_case(login))
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed_hash =
            PasswordHash::new(&account.hash).map_err(|_| AuthError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        Ok(&account.user_id)
    }

    /// The admin account, or the first one when the tenant has no admin.
    pub fn auto_login(&self) -> Option<&str> {
        self.accounts
            .iter()
            .find(|account| account.role == UserRole::Admin)
            .or_else(|| self.accounts.first())
            .map(|account| account.user_id.as_str())
    }
}

pub fn has_role(user: &User, role: UserRole) -> bool {
    user.role.grants(role)
}

pub fn require_role(user: &User, role: UserRole) -> Result<(), AppError> {
    if has_role(user, role) {
        Ok(())
    } else {
        tracing::warn!(user = %user.id, required = %role, "role check failed");
        Err(AppError::forbidden(format!("requires the {role} role")))
    }
}
