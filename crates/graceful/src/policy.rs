//! Exit code policy and the error sink

use graceful_core::{
    Error, Result, EXIT_CODE_AUTO, EXIT_CODE_ERR, EXIT_CODE_OK, GRACEFUL_EXIT_CODE_ERR_VAR,
    GRACEFUL_EXIT_CODE_OK_VAR, GRACEFUL_EXIT_WITH_SIGNAL_CODE_VAR,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback invoked once per failed action during any cleanup pass
pub type ErrorSink = Arc<dyn Fn(&Error) + Send + Sync>;

/// How the outcome of the final cleanup pass maps to a process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitPolicy {
    /// Exit with the number of the caught signal instead of `err_code`
    pub exit_with_signal_code: bool,
    /// Exit code when no action failed
    pub ok_code: i32,
    /// Exit code when at least one action failed, or on a signal
    pub err_code: i32,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            exit_with_signal_code: false,
            ok_code: EXIT_CODE_OK,
            err_code: EXIT_CODE_ERR,
        }
    }
}

impl ExitPolicy {
    /// Defaults overlaid with the `GRACEFUL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();

        if let Some(value) = lookup(GRACEFUL_EXIT_WITH_SIGNAL_CODE_VAR) {
            policy.exit_with_signal_code = parse_bool(GRACEFUL_EXIT_WITH_SIGNAL_CODE_VAR, &value)?;
        }
        if let Some(value) = lookup(GRACEFUL_EXIT_CODE_OK_VAR) {
            policy.ok_code = parse_code(GRACEFUL_EXIT_CODE_OK_VAR, &value)?;
        }
        if let Some(value) = lookup(GRACEFUL_EXIT_CODE_ERR_VAR) {
            policy.err_code = parse_code(GRACEFUL_EXIT_CODE_ERR_VAR, &value)?;
        }

        Ok(policy)
    }

    /// Exit code for an explicit exit request
    ///
    /// `EXIT_CODE_AUTO` picks `ok_code` or `err_code` from `erred`; any other
    /// code is used as is.
    pub fn code_for_exit(&self, code: i32, erred: bool) -> i32 {
        match code {
            EXIT_CODE_AUTO if erred => self.err_code,
            EXIT_CODE_AUTO => self.ok_code,
            code => code,
        }
    }

    /// Exit code after cleaning up for a caught signal
    pub fn code_for_signal(&self, signal: i32) -> i32 {
        if self.exit_with_signal_code {
            signal
        } else {
            self.err_code
        }
    }
}

fn parse_bool(variable: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(Error::configuration(
            variable,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_code(variable: &str, value: &str) -> Result<i32> {
    value.trim().parse().map_err(|e| {
        Error::configuration(variable, format!("invalid exit code '{value}': {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_auto_exit_code() {
        let policy = ExitPolicy::default();
        assert_eq!(policy.code_for_exit(EXIT_CODE_AUTO, false), 0);
        assert_eq!(policy.code_for_exit(EXIT_CODE_AUTO, true), 1);
    }

    #[test]
    fn test_explicit_exit_code_ignores_outcome() {
        let policy = ExitPolicy::default();
        assert_eq!(policy.code_for_exit(42, false), 42);
        assert_eq!(policy.code_for_exit(42, true), 42);
        assert_eq!(policy.code_for_exit(0, true), 0);
    }

    #[test]
    fn test_signal_exit_code() {
        let mut policy = ExitPolicy {
            err_code: 55,
            ..Default::default()
        };
        assert_eq!(policy.code_for_signal(15), 55);

        policy.exit_with_signal_code = true;
        assert_eq!(policy.code_for_signal(15), 15);
    }

    #[test]
    fn test_from_lookup() {
        let policy = ExitPolicy::from_lookup(lookup(&[
            (GRACEFUL_EXIT_WITH_SIGNAL_CODE_VAR, "true"),
            (GRACEFUL_EXIT_CODE_ERR_VAR, " 3 "),
        ]))
        .unwrap();

        assert!(policy.exit_with_signal_code);
        assert_eq!(policy.ok_code, 0);
        assert_eq!(policy.err_code, 3);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ExitPolicy::from_lookup(lookup(&[(GRACEFUL_EXIT_CODE_OK_VAR, "zero")]))
            .unwrap_err();
        assert!(err.to_string().contains(GRACEFUL_EXIT_CODE_OK_VAR));

        let err =
            ExitPolicy::from_lookup(lookup(&[(GRACEFUL_EXIT_WITH_SIGNAL_CODE_VAR, "maybe")]))
                .unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(GRACEFUL_EXIT_CODE_OK_VAR, "9");
        let policy = ExitPolicy::from_env();
        std::env::remove_var(GRACEFUL_EXIT_CODE_OK_VAR);

        assert_eq!(policy.unwrap().ok_code, 9);
    }

    #[test]
    fn test_deserialize_partial() {
        let policy: ExitPolicy = serde_json::from_str(r#"{"err_code": 70}"#).unwrap();
        assert_eq!(
            policy,
            ExitPolicy {
                err_code: 70,
                ..Default::default()
            }
        );
    }
}
