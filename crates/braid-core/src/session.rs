//! Session-scoped configuration.
//!
//! Every setting that changes commit-gate or write-path behavior lives in an
//! explicit record threaded through the call that needs it. There is no
//! process-wide settings singleton.

use crate::error::{ErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};

/// Setting name for bypassing the violation commit gate together with `--force`.
pub const SETTING_FORCE_TRANSACTION_COMMIT: &str = "braid_force_transaction_commit";
/// Setting name for committing with an undrained conflicts ledger.
pub const SETTING_ALLOW_COMMIT_CONFLICTS: &str = "braid_allow_commit_conflicts";
/// Setting name for write-time foreign-key enforcement.
pub const SETTING_FOREIGN_KEY_CHECKS: &str = "foreign_key_checks";

///
/// SessionConfig
///
/// Session policy consulted by the commit gate and the normal write path.
/// Merge-time validation ignores `foreign_key_checks` on purpose: latent
/// violations written while checks were off are still caught when the
/// merged state is validated.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SessionConfig {
    pub force_transaction_commit: bool,
    pub allow_commit_conflicts: bool,
    pub foreign_key_checks: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            force_transaction_commit: false,
            allow_commit_conflicts: false,
            foreign_key_checks: true,
        }
    }
}

impl SessionConfig {
    /// Apply one `name = 0|1` assignment.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), InternalError> {
        let enabled = match value {
            "0" => false,
            "1" => true,
            other => {
                return Err(InternalError::new(
                    crate::error::ErrorClass::Unsupported,
                    ErrorOrigin::Interface,
                    format!("invalid session value '{other}' for '{name}': expected 0 or 1"),
                ));
            }
        };

        match name {
            SETTING_FORCE_TRANSACTION_COMMIT => self.force_transaction_commit = enabled,
            SETTING_ALLOW_COMMIT_CONFLICTS => self.allow_commit_conflicts = enabled,
            SETTING_FOREIGN_KEY_CHECKS => self.foreign_key_checks = enabled,
            other => {
                return Err(InternalError::not_found(
                    ErrorOrigin::Interface,
                    format!("unknown session setting '{other}'"),
                ));
            }
        }

        Ok(())
    }

    /// Read one setting back as its `0|1` wire form.
    pub fn get(&self, name: &str) -> Result<&'static str, InternalError> {
        let enabled = match name {
            SETTING_FORCE_TRANSACTION_COMMIT => self.force_transaction_commit,
            SETTING_ALLOW_COMMIT_CONFLICTS => self.allow_commit_conflicts,
            SETTING_FOREIGN_KEY_CHECKS => self.foreign_key_checks,
            other => {
                return Err(InternalError::not_found(
                    ErrorOrigin::Interface,
                    format!("unknown session setting '{other}'"),
                ));
            }
        };

        Ok(if enabled { "1" } else { "0" })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_checks_on_and_gates_armed() {
        let session = SessionConfig::default();
        assert!(!session.force_transaction_commit);
        assert!(!session.allow_commit_conflicts);
        assert!(session.foreign_key_checks);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut session = SessionConfig::default();
        session.set(SETTING_FORCE_TRANSACTION_COMMIT, "1").unwrap();
        assert_eq!(session.get(SETTING_FORCE_TRANSACTION_COMMIT).unwrap(), "1");
        session.set(SETTING_FOREIGN_KEY_CHECKS, "0").unwrap();
        assert!(!session.foreign_key_checks);
    }

    #[test]
    fn rejects_unknown_names_and_values() {
        let mut session = SessionConfig::default();
        assert!(session.set("braid_no_such_setting", "1").is_err());
        assert!(session.set(SETTING_ALLOW_COMMIT_CONFLICTS, "yes").is_err());
    }
}
