#![forbid(unsafe_code)]

use crate::identity::AuthUser;
use clap::Parser;
use pb_core::ids::UserId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pb_mcp",
    version,
    about = "Planeboard MCP server: workspaces, projects, issues and kanban boards over stdio"
)]
pub(crate) struct Config {
    /// Directory holding planeboard.db.
    #[arg(long, env = "PLANEBOARD_STORAGE_DIR", default_value = ".planeboard")]
    pub(crate) storage_dir: PathBuf,

    /// Email of the signed-in user. Without it every write is refused.
    #[arg(long, env = "PLANEBOARD_USER_EMAIL")]
    pub(crate) user_email: Option<String>,

    /// Explicit user id; derived from the email when absent.
    #[arg(long, env = "PLANEBOARD_USER_ID", requires = "user_email")]
    pub(crate) user_id: Option<UserId>,

    #[arg(long, env = "PLANEBOARD_USER_NAME", requires = "user_email")]
    pub(crate) user_name: Option<String>,

    /// Log filter such as `info` or `pb_mcp=debug`; falls back to RUST_LOG.
    #[arg(long, env = "PLANEBOARD_LOG")]
    pub(crate) log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("user email must look like name@host (got {0:?})")]
    InvalidEmail(String),
    #[error("invalid log filter {filter:?}: {source}")]
    LogFilter {
        filter: String,
        source: tracing_subscriber::filter::ParseError,
    },
}

impl Config {
    pub(crate) fn auth_user(&self) -> Result<Option<AuthUser>, ConfigError> {
        let Some(email) = self
            .user_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
        else {
            return Ok(None);
        };
        if !email.contains('@') {
            return Err(ConfigError::InvalidEmail(email.to_string()));
        }
        Ok(Some(AuthUser::new(
            email,
            self.user_id,
            self.user_name.clone(),
        )))
    }
}

/// Logs go to stderr; stdout carries the protocol.
pub(crate) fn init_logging(level: Option<&str>) -> Result<(), ConfigError> {
    let filter = match level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "info".to_string()),
    };
    let env_filter = EnvFilter::try_new(&filter).map_err(|source| ConfigError::LogFilter {
        filter: filter.clone(),
        source,
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_an_id_is_keyed_by_email() {
        let config = Config::try_parse_from([
            "pb_mcp",
            "--storage-dir",
            "/tmp/pb",
            "--user-email",
            " Ada@Example.com ",
            "--user-name",
            "Ada",
        ])
        .unwrap();
        let user = config.auth_user().unwrap().unwrap();
        assert_eq!(user.email, "Ada@Example.com");
        assert_eq!(user.id, None);
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/pb"));
    }

    #[test]
    fn explicit_user_id_wins() {
        let id = UserId::generate();
        let config = Config::try_parse_from([
            "pb_mcp",
            "--user-email",
            "ada@example.com",
            "--user-id",
            &id.to_string(),
        ])
        .unwrap();
        assert_eq!(config.auth_user().unwrap().unwrap().id, Some(id));
    }

    #[test]
    fn rejects_malformed_identity() {
        let config = Config::try_parse_from(["pb_mcp", "--user-email", "not-an-email"]).unwrap();
        assert!(matches!(
            config.auth_user(),
            Err(ConfigError::InvalidEmail(_))
        ));
        assert!(Config::try_parse_from(["pb_mcp", "--user-id", "nope"]).is_err());
    }
}
