use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::domain::Error;

pub const WORKERS_ENV: &str = "TRANSFER_ENGINE_WORKERS";
pub const LOG_LEVEL_ENV: &str = "TRANSFER_ENGINE_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub accounts_path: PathBuf,
    pub transfers_path: PathBuf,
    /// Transfers executed at the same time.
    pub workers: usize,
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Config {
    /// Reads `<accounts.csv> <transfers.csv>` from the command line and the
    /// tuning knobs from the environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_parts(env::args().skip(1), |key| env::var(key).ok())
    }

    pub fn from_parts<I, F>(args: I, var: F) -> Result<Self, Error>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter();
        let accounts_path = args
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| Error::Config("missing accounts file argument".to_string()))?;
        let transfers_path = args
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| Error::Config("missing transfers file argument".to_string()))?;

        let workers = match var(WORKERS_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|e| Error::Config(format!("{} must be a positive integer: {}", WORKERS_ENV, e)))?
                .get(),
            None => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        };

        let log_level = var(LOG_LEVEL_ENV).unwrap_or_else(|| "info".to_string());

        Ok(Self {
            accounts_path,
            transfers_path,
            workers,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_paths_and_env_overrides() {
        let env: HashMap<&str, &str> = [(WORKERS_ENV, "3"), (LOG_LEVEL_ENV, "debug")].into();
        let config = Config::from_parts(args(&["accounts.csv", "transfers.csv"]), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.accounts_path, PathBuf::from("accounts.csv"));
        assert_eq!(config.transfers_path, PathBuf::from("transfers.csv"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn defaults_without_env() {
        let config = Config::from_parts(args(&["a.csv", "t.csv"]), |_| None).unwrap();
        assert!(config.workers >= 1);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn rejects_missing_paths_and_bad_workers() {
        assert!(matches!(
            Config::from_parts(args(&["a.csv"]), |_| None),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_parts(args(&["a.csv", "t.csv"]), |_| Some("0".to_string())),
            Err(Error::Config(_))
        ));
    }
}
