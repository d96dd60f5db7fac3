use crate::errors::AuthError;
use crate::models::normalize_username;
use crate::storage::CredentialStore;
use tracing::{info, warn};

/// Which form the account page is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountMode {
    #[default]
    Login,
    SignUp,
    Recover,
}

impl AccountMode {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("signup") => Self::SignUp,
            Some("recover") => Self::Recover,
            _ => Self::Login,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SignUp => "signup",
            Self::Recover => "recover",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AccountRequest {
    Login {
        username: String,
        password: String,
    },
    SignUp {
        username: String,
        password: String,
        recovery_key: Option<String>,
    },
    Recover {
        username: String,
        recovery_key: String,
    },
}

impl AccountRequest {
    pub fn mode(&self) -> AccountMode {
        match self {
            Self::Login { .. } => AccountMode::Login,
            Self::SignUp { .. } => AccountMode::SignUp,
            Self::Recover { .. } => AccountMode::Recover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Granted { user: String },
    Created { user: String },
    Revealed { user: String, password: String },
}

/// Runs one account request against a fresh snapshot of the credential file.
pub async fn submit(
    store: &CredentialStore,
    request: AccountRequest,
) -> Result<AccountOutcome, AuthError> {
    match request {
        AccountRequest::Login { username, password } => {
            let user = normalize_username(&username);
            if user.is_empty() {
                return Err(AuthError::InvalidCredentials);
            }
            let users = store.load().await?;
            if users.authenticate(&user, &password) {
                info!(user = %user, "login granted");
                Ok(AccountOutcome::Granted { user })
            } else {
                warn!(user = %user, "login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
        AccountRequest::SignUp {
            username,
            password,
            recovery_key,
        } => {
            let user = normalize_username(&username);
            if user.is_empty() || password.is_empty() {
                return Err(AuthError::MissingFields);
            }
            let record = store
                .create(&user, &password, recovery_key.as_deref())
                .await
                .inspect_err(|err| warn!(user = %user, "sign-up rejected: {err}"))?;
            info!(user = %record.username, "account created");
            Ok(AccountOutcome::Created {
                user: record.username,
            })
        }
        AccountRequest::Recover {
            username,
            recovery_key,
        } => {
            let user = normalize_username(&username);
            if user.is_empty() || recovery_key.is_empty() {
                return Err(AuthError::RecoveryFailed);
            }
            let users = store.load().await?;
            match users.recover(&user, &recovery_key) {
                Ok(password) => {
                    info!(user = %user, "password revealed by recovery key");
                    Ok(AccountOutcome::Revealed { user, password })
                }
                Err(err) => {
                    warn!(user = %user, "recovery rejected");
                    Err(err.into())
                }
            }
        }
    }
}
