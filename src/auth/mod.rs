//! Bearer token sources for outgoing requests.
//!
//! The client only depends on [`AuthTokenProvider`]. [`AuthTokenLoader`] is the
//! stock provider and reads the token from a constant, an environment
//! variable, a file, or the output of an external command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;

use crate::http::BoxFuture;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("auth token is empty")]
    EmptyToken,

    #[error("failed to read auth token from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run token command {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("token command {program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Supplies the bearer token attached to each logical call.
///
/// Implementations may cache; callers treat every call as fresh.
pub trait AuthTokenProvider: Send + Sync {
    fn get_token(&self) -> BoxFuture<'_, Result<String, AuthError>>;
}

/// Where an [`AuthTokenLoader`] reads its token from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthTokenMode {
    Constant(String),
    EnvVar(String),
    File(PathBuf),
    Command { program: String, args: Vec<String> },
}

struct CachedToken {
    token: String,
    loaded_at: Instant,
}

pub struct AuthTokenLoader {
    mode: AuthTokenMode,
    refresh_interval: Option<Duration>,
    cached: Mutex<Option<CachedToken>>,
}

impl AuthTokenLoader {
    /// Creates a loader that reads the source on every call.
    pub fn new(mode: AuthTokenMode) -> Self {
        Self {
            mode,
            refresh_interval: None,
            cached: Mutex::new(None),
        }
    }

    /// Keeps a loaded token for `interval` before reading the source again.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn mode(&self) -> &AuthTokenMode {
        &self.mode
    }

    pub fn into_provider(self) -> Arc<dyn AuthTokenProvider> {
        Arc::new(self)
    }

    fn cached_token(&self) -> Option<String> {
        let interval = self.refresh_interval?;
        let cached = self.cached.lock();
        cached
            .as_ref()
            .filter(|entry| entry.loaded_at.elapsed() < interval)
            .map(|entry| entry.token.clone())
    }

    /// Drops any cached token so the next call reads the source.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    async fn load(&self) -> Result<String, AuthError> {
        let raw = match &self.mode {
            AuthTokenMode::Constant(token) => token.clone(),
            AuthTokenMode::EnvVar(name) => {
                std::env::var(name).map_err(|_| AuthError::MissingEnvVar(name.clone()))?
            }
            AuthTokenMode::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| AuthError::Io {
                        path: path.clone(),
                        source,
                    })?
            }
            AuthTokenMode::Command { program, args } => run_command(program, args).await?,
        };

        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(token.to_string())
    }
}

async fn run_command(program: &str, args: &[String]) -> Result<String, AuthError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| AuthError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(AuthError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl AuthTokenProvider for AuthTokenLoader {
    fn get_token(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        Box::pin(async move {
            if let Some(token) = self.cached_token() {
                return Ok(token);
            }

            let token = self.load().await?;
            tracing::debug!("Auth token loaded");

            if self.refresh_interval.is_some() {
                *self.cached.lock() = Some(CachedToken {
                    token: token.clone(),
                    loaded_at: Instant::now(),
                });
            }
            Ok(token)
        })
    }
}

impl std::fmt::Debug for AuthTokenLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.mode {
            AuthTokenMode::Constant(_) => "Constant(<redacted>)".to_string(),
            other => format!("{:?}", other),
        };
        f.debug_struct("AuthTokenLoader")
            .field("mode", &mode)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_constant_token_is_trimmed() {
        let loader = AuthTokenLoader::new(AuthTokenMode::Constant("  abc\n".into()));
        assert_eq!(loader.get_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let loader = AuthTokenLoader::new(AuthTokenMode::Constant("   ".into()));
        assert!(matches!(loader.get_token().await, Err(AuthError::EmptyToken)));
    }

    #[tokio::test]
    async fn test_missing_env_var() {
        let name = "METERING_CLIENT_TEST_TOKEN_UNSET";
        std::env::remove_var(name);
        let loader = AuthTokenLoader::new(AuthTokenMode::EnvVar(name.into()));
        match loader.get_token().await {
            Err(AuthError::MissingEnvVar(var)) => assert_eq!(var, name),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_env_var_token() {
        let name = "METERING_CLIENT_TEST_TOKEN_SET";
        std::env::set_var(name, "from-env");
        let loader = AuthTokenLoader::new(AuthTokenMode::EnvVar(name.into()));
        assert_eq!(loader.get_token().await.unwrap(), "from-env");
        std::env::remove_var(name);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_interval_caches_token() {
        let name = "METERING_CLIENT_TEST_TOKEN_CACHED";
        std::env::set_var(name, "first");
        let loader = AuthTokenLoader::new(AuthTokenMode::EnvVar(name.into()))
            .with_refresh_interval(Duration::from_secs(60));

        assert_eq!(loader.get_token().await.unwrap(), "first");
        std::env::set_var(name, "second");
        assert_eq!(loader.get_token().await.unwrap(), "first");

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(loader.get_token().await.unwrap(), "second");

        std::env::set_var(name, "third");
        loader.invalidate();
        assert_eq!(loader.get_token().await.unwrap(), "third");
        std::env::remove_var(name);
    }

    #[test]
    fn test_debug_redacts_constant() {
        let loader = AuthTokenLoader::new(AuthTokenMode::Constant("secret".into()));
        let debug = format!("{:?}", loader);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
