use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::event_rule::BinlogEventRule;
use crate::config::route::RouteRule;
use crate::err::re_error::ReError;
use crate::err::CResult;
use crate::schema::rules::Rules;

/// Pre-check deadline when the task does not set one.
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 60;

/// Connection settings of a MySQL instance.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DBConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl DBConfig {
    pub fn new(host: &str, port: u16, user: &str, password: &str) -> Self {
        DBConfig {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    /// `host:port`, the identity of an instance in sharding maps and logs.
    pub fn instance_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for DBConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DBConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"******")
            .finish()
    }
}

/// Configuration of one sub-task: one source instance replicated into the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubTaskConfig {
    pub name: String,

    /// Keeps rule strings as written instead of lowercasing them.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Pre-check deadline in seconds.
    #[serde(default = "default_check_timeout")]
    pub check_timeout: u64,

    pub from: DBConfig,

    pub to: DBConfig,

    #[serde(default)]
    pub bw_list: Option<Rules>,

    #[serde(default)]
    pub route_rules: Vec<RouteRule>,

    #[serde(default)]
    pub filter_rules: Vec<BinlogEventRule>,
}

fn default_check_timeout() -> u64 {
    DEFAULT_CHECK_TIMEOUT_SECS
}

impl SubTaskConfig {
    /// Parses a task config from TOML text and adjusts it.
    pub fn from_toml_str(text: &str) -> CResult<Self> {
        let mut cfg: SubTaskConfig = toml::from_str(text)
            .map_err(|e| ReError::ConfigFileParseErr(e.to_string()))?;
        cfg.adjust()?;

        Ok(cfg)
    }

    /// Validates the config and lowercases the rules unless `case-sensitive` is set.
    pub fn adjust(&mut self) -> CResult<()> {
        if self.name.is_empty() {
            return Err(ReError::ConfigFileParseErr("sub task name must not be empty".to_string()));
        }

        if !self.case_sensitive {
            if let Some(rules) = self.bw_list.as_mut() {
                rules.to_lower();
            }
            for rule in self.filter_rules.iter_mut() {
                rule.to_lower();
            }
            for rule in self.route_rules.iter_mut() {
                rule.schema_pattern = rule.schema_pattern.to_lowercase();
                rule.table_pattern = rule.table_pattern.to_lowercase();
            }
        }

        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout)
    }
}

pub fn read_config<P: AsRef<Path>>(path: P) -> CResult<SubTaskConfig> {
    let mut file = File::open(path.as_ref())?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;

    SubTaskConfig::from_toml_str(s.as_str())
}
