use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionType {
    Direct,
    Indirect,
}

impl EmissionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "Direct",
            Self::Indirect => "Indirect",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Direct" => Some(Self::Direct),
            "Indirect" => Some(Self::Indirect),
            _ => None,
        }
    }
}

impl fmt::Display for EmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the emissions workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub category: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: EmissionType,
}

impl CategoryRecord {
    pub fn new(category: impl Into<String>, value: f64, kind: EmissionType) -> Self {
        Self {
            category: category.into(),
            value,
            kind,
        }
    }
}

/// Rows written when the workbook does not exist yet.
pub fn seed_categories() -> Vec<CategoryRecord> {
    vec![
        CategoryRecord::new("Electricity", 450.0, EmissionType::Direct),
        CategoryRecord::new("Natural Gas", 200.0, EmissionType::Direct),
        CategoryRecord::new("Transport", 150.0, EmissionType::Indirect),
        CategoryRecord::new("Waste", 100.0, EmissionType::Indirect),
    ]
}

/// One line of the credential file. Passwords and recovery keys are stored
/// in plain text so that recovery can hand the password back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub recovery_key: Option<String>,
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Snapshot of the credential file taken at the start of a request.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    pub users: Vec<UserRecord>,
}

impl UserTable {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self { users }
    }

    /// Every row whose name normalizes to `username`. Duplicates can exist
    /// when two sign-ups race.
    fn matching<'a>(&'a self, username: &str) -> impl Iterator<Item = &'a UserRecord> + 'a {
        let wanted = normalize_username(username);
        self.users
            .iter()
            .filter(move |user| normalize_username(&user.username) == wanted)
    }

    pub fn exists(&self, username: &str) -> bool {
        self.matching(username).next().is_some()
    }

    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.matching(username).any(|user| user.password == password)
    }

    pub fn recover(&self, username: &str, recovery_key: &str) -> Result<String, StoreError> {
        if recovery_key.is_empty() {
            return Err(StoreError::NotFound);
        }
        self.matching(username)
            .find_map(|user| {
                (user.recovery_key.as_deref() == Some(recovery_key)).then(|| user.password.clone())
            })
            .ok_or(StoreError::NotFound)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recovery_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RecoverForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub recovery_key: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub category: String,
    pub value: f64,
    pub kind: Option<EmissionType>,
    pub updated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SliceResponse {
    pub category: String,
    pub value: f64,
    pub share: f64,
}
