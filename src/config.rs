//! Configuration from `PLACEBO_*` environment variables.
//!
//! With `PLACEBO_TESTING=1`, ids that differ between the real hunt and a
//! scratch workspace are read from their `*_TESTING` variants instead.
//!
//! Slack and Google are configured independently. Leaving out a service's
//! token runs that side against an in-memory backend (dry run).

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_WORKSPACE: &str = "placebo";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(String),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlackConfig {
    pub token: String,
    pub qm_channel_id: String,
    pub unlocks_channel_id: String,
    /// User (or channel) that error-level logs are sent to.
    pub admin_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleConfig {
    /// OAuth access token, acquired outside the bot.
    pub access_token: String,
    pub spreadsheet_id: String,
    /// Numeric id of the puzzle list tab.
    pub sheet_id: i64,
    pub template_id: String,
    pub puzzles_folder_id: String,
    pub solved_folder_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub testing: bool,
    pub debug_logs: bool,
    pub create_metas: bool,
    /// Slack workspace subdomain, used in tracker channel links.
    pub slack_workspace: String,
    /// Slack signing secret; requests are not verified without one.
    pub signing_secret: Option<String>,
    /// `None` runs chat against the in-memory backend.
    pub slack: Option<SlackConfig>,
    /// `None` runs the tracker and documents against in-memory backends.
    pub google: Option<GoogleConfig>,
}

/// Reads variables through `lookup`, applying the testing suffix.
struct Vars<F> {
    lookup: F,
    testing: bool,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    /// A variable with a separate value under `PLACEBO_TESTING=1`.
    fn per_environment(&self, name: &str) -> Result<String, ConfigError> {
        if self.testing {
            self.required(&format!("{name}_TESTING"))
        } else {
            self.required(name)
        }
    }

    fn flag(&self, name: &str, default: bool) -> bool {
        self.optional(name).map_or(default, |v| v == "1")
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, value: String) -> Result<T, ConfigError> {
        value.parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        })
    }
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let testing = lookup("PLACEBO_TESTING").as_deref() == Some("1");
        let vars = Vars { lookup, testing };

        let port = match vars.optional("PORT") {
            Some(port) => vars.parsed("PORT", port)?,
            None => DEFAULT_PORT,
        };

        let slack = match vars.optional("PLACEBO_SLACK_TOKEN") {
            Some(token) => Some(SlackConfig {
                token,
                qm_channel_id: vars.per_environment("PLACEBO_QM_CHANNEL_ID")?,
                unlocks_channel_id: vars.per_environment("PLACEBO_UNLOCKS_CHANNEL_ID")?,
                admin_user: vars.optional("PLACEBO_ADMIN_SLACK_USER"),
            }),
            None => None,
        };

        let google = match vars.optional("PLACEBO_GOOGLE_ACCESS_TOKEN") {
            Some(access_token) => {
                let sheet_name = if testing {
                    "PLACEBO_PUZZLE_LIST_SHEET_ID_TESTING"
                } else {
                    "PLACEBO_PUZZLE_LIST_SHEET_ID"
                };
                let sheet_id = vars.per_environment("PLACEBO_PUZZLE_LIST_SHEET_ID")?;
                Some(GoogleConfig {
                    access_token,
                    spreadsheet_id: vars.per_environment("PLACEBO_PUZZLE_LIST_SPREADSHEET_ID")?,
                    sheet_id: vars.parsed(sheet_name, sheet_id)?,
                    template_id: vars.required("PLACEBO_PUZZLE_TEMPLATE_ID")?,
                    puzzles_folder_id: vars.per_environment("PLACEBO_PUZZLES_FOLDER_ID")?,
                    solved_folder_id: vars.per_environment("PLACEBO_SOLVED_FOLDER_ID")?,
                })
            }
            None => None,
        };

        Ok(Config {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            testing,
            debug_logs: vars.flag("PLACEBO_DEBUG_LOGS", false),
            create_metas: vars.flag("PLACEBO_CREATE_METAS", true),
            slack_workspace: vars
                .optional("PLACEBO_SLACK_WORKSPACE")
                .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
            signing_secret: vars.optional("PLACEBO_SLACK_SIGNING_SECRET"),
            slack,
            google,
        })
    }

    /// The default `tracing` filter for this configuration.
    pub fn log_filter(&self) -> &'static str {
        if self.debug_logs {
            "placebo=debug"
        } else {
            "placebo=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const GOOGLE: [(&str, &str); 6] = [
        ("PLACEBO_GOOGLE_ACCESS_TOKEN", "ya29.token"),
        ("PLACEBO_PUZZLE_LIST_SPREADSHEET_ID", "sheet"),
        ("PLACEBO_PUZZLE_LIST_SHEET_ID", "42"),
        ("PLACEBO_PUZZLE_TEMPLATE_ID", "template"),
        ("PLACEBO_PUZZLES_FOLDER_ID", "puzzles"),
        ("PLACEBO_SOLVED_FOLDER_ID", "solved"),
    ];

    #[test]
    fn empty_environment_is_a_dry_run() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
        assert!(config.create_metas);
        assert!(!config.debug_logs);
        assert!(config.slack.is_none());
        assert!(config.google.is_none());
        assert!(config.signing_secret.is_none());
        assert_eq!(config.log_filter(), "placebo=info");
    }

    #[test]
    fn metas_can_be_disabled() {
        let config = config(&[("PLACEBO_CREATE_METAS", "0")]).unwrap();
        assert!(!config.create_metas);
    }

    #[test]
    fn slack_token_requires_channels() {
        assert_eq!(
            config(&[("PLACEBO_SLACK_TOKEN", "xoxb")]),
            Err(ConfigError::Missing("PLACEBO_QM_CHANNEL_ID".to_string()))
        );
    }

    #[test]
    fn testing_reads_testing_variants() {
        let config = config(&[
            ("PLACEBO_TESTING", "1"),
            ("PLACEBO_SLACK_TOKEN", "xoxb"),
            ("PLACEBO_QM_CHANNEL_ID", "CREAL"),
            ("PLACEBO_QM_CHANNEL_ID_TESTING", "CTEST"),
            ("PLACEBO_UNLOCKS_CHANNEL_ID_TESTING", "CUNLOCKS"),
        ])
        .unwrap();
        let slack = config.slack.unwrap();
        assert_eq!(slack.qm_channel_id, "CTEST");
        assert_eq!(slack.unlocks_channel_id, "CUNLOCKS");
        assert_eq!(slack.admin_user, None);
    }

    #[test]
    fn admin_user_is_optional() {
        let config = config(&[
            ("PLACEBO_SLACK_TOKEN", "xoxb"),
            ("PLACEBO_QM_CHANNEL_ID", "CQM"),
            ("PLACEBO_UNLOCKS_CHANNEL_ID", "CUNLOCKS"),
            ("PLACEBO_ADMIN_SLACK_USER", "UADMIN"),
        ])
        .unwrap();
        assert_eq!(config.slack.unwrap().admin_user.as_deref(), Some("UADMIN"));
    }

    #[test]
    fn google_config_parses_sheet_id() {
        let config = config(&GOOGLE).unwrap();
        let google = config.google.unwrap();
        assert_eq!(google.sheet_id, 42);
        assert_eq!(google.template_id, "template");
    }

    #[test]
    fn invalid_sheet_id_is_reported() {
        let mut vars = GOOGLE.to_vec();
        vars[2] = ("PLACEBO_PUZZLE_LIST_SHEET_ID", "tab one");
        assert_eq!(
            config(&vars),
            Err(ConfigError::Invalid {
                name: "PLACEBO_PUZZLE_LIST_SHEET_ID".to_string(),
                value: "tab one".to_string(),
            })
        );
    }

    #[test]
    fn invalid_port_is_reported() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
