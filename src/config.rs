use std::{env, net::SocketAddr, path::PathBuf};

const DEFAULT_DATA_PATH: &str = "data/main_data.xlsx";
const DEFAULT_USER_DB: &str = "data/users.csv";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_MINUTES: i64 = crate::session::DEFAULT_TTL_MINUTES;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub user_db_path: PathBuf,
    pub port: u16,
    pub session_ttl_minutes: i64,
}

impl AppConfig {
    /// Reads `GHG_DATA_PATH`, `GHG_USER_DB`, `PORT` and
    /// `GHG_SESSION_TTL_MINUTES`, falling back to the defaults under `data/`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_path = lookup("GHG_DATA_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
        let user_db_path = lookup("GHG_USER_DB")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_USER_DB));
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let session_ttl_minutes = lookup("GHG_SESSION_TTL_MINUTES")
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_MINUTES);

        Self {
            data_path,
            user_db_path,
            port,
            session_ttl_minutes,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
