use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ::binlog::BinlogType;
use common::db::Database;

use crate::check::{global_variable, Check, CheckResult};

/// `log_bin` must be `ON`.
pub struct BinlogEnableCheck {
    name: String,
    db: Arc<dyn Database>,
}

impl BinlogEnableCheck {
    pub fn new(db: Arc<dyn Database>, instance_id: &str) -> Self {
        BinlogEnableCheck {
            name: format!("mysql binlog enable check {}", instance_id),
            db,
        }
    }
}

#[async_trait]
impl Check for BinlogEnableCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: &CancellationToken) -> CheckResult {
        let result = CheckResult::new(&self.name, "check whether mysql binlog is enabled");
        let instruction = "enable log_bin in the server config, see https://dev.mysql.com/doc/refman/5.7/en/replication-howto-masterbaseconfig.html";

        match global_variable(&self.db, token, "log_bin").await {
            Ok(Some(v)) if v.eq_ignore_ascii_case("ON") => result,
            Ok(Some(v)) => result.fail(format!("log_bin is {}, and should be ON", v), instruction),
            Ok(None) => result.fail("log_bin is not set, and should be ON", instruction),
            Err(e) => result.fail(e.to_string(), instruction),
        }
    }
}

/// `binlog_format` must be `ROW`.
pub struct BinlogFormatCheck {
    name: String,
    db: Arc<dyn Database>,
}

impl BinlogFormatCheck {
    pub fn new(db: Arc<dyn Database>, instance_id: &str) -> Self {
        BinlogFormatCheck {
            name: format!("mysql binlog_format check {}", instance_id),
            db,
        }
    }
}

#[async_trait]
impl Check for BinlogFormatCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: &CancellationToken) -> CheckResult {
        let result = CheckResult::new(&self.name, "check whether mysql binlog_format is ROW");
        let instruction = "set global binlog_format=ROW;";

        match global_variable(&self.db, token, "binlog_format").await {
            Ok(Some(v)) => match BinlogType::from_str(&v) {
                Ok(BinlogType::Row) => result,
                _ => result.fail(format!("binlog_format is {}, and should be ROW", v), instruction),
            },
            Ok(None) => result.fail("binlog_format is not set, and should be ROW", instruction),
            Err(e) => result.fail(e.to_string(), instruction),
        }
    }
}

/// `binlog_row_image` must be `FULL` on servers that have the variable.
pub struct BinlogRowImageCheck {
    name: String,
    db: Arc<dyn Database>,
}

impl BinlogRowImageCheck {
    pub fn new(db: Arc<dyn Database>, instance_id: &str) -> Self {
        BinlogRowImageCheck {
            name: format!("mysql binlog_row_image check {}", instance_id),
            db,
        }
    }
}

#[async_trait]
impl Check for BinlogRowImageCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: &CancellationToken) -> CheckResult {
        let result = CheckResult::new(&self.name, "check whether mysql binlog_row_image is FULL");
        let instruction = "set global binlog_row_image = FULL;";

        match global_variable(&self.db, token, "binlog_row_image").await {
            // older servers always log full rows
            Ok(None) => result,
            Ok(Some(v)) if v.eq_ignore_ascii_case("FULL") => result,
            Ok(Some(v)) => result.fail(format!("binlog_row_image is {}, and should be FULL", v), instruction),
            Err(e) => result.fail(e.to_string(), instruction),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use common::db::mock::MockDatabase;
    use common::db::Database;

    use crate::check::binlog::{BinlogEnableCheck, BinlogFormatCheck, BinlogRowImageCheck};
    use crate::check::{Check, CheckState};

    #[tokio::test]
    async fn test_binlog_checks_pass() {
        let db: Arc<dyn Database> = Arc::new(
            MockDatabase::new()
                .with_variable("log_bin", "ON")
                .with_variable("binlog_format", "ROW")
                .with_rows("SHOW GLOBAL VARIABLES LIKE 'binlog_row_image'", vec![]),
        );
        let token = CancellationToken::new();

        assert_eq!(*BinlogEnableCheck::new(db.clone(), "i").run(&token).await.state(), CheckState::Success);
        assert_eq!(*BinlogFormatCheck::new(db.clone(), "i").run(&token).await.state(), CheckState::Success);
        assert_eq!(*BinlogRowImageCheck::new(db, "i").run(&token).await.state(), CheckState::Success);
    }

    #[tokio::test]
    async fn test_binlog_checks_fail() {
        let db: Arc<dyn Database> = Arc::new(
            MockDatabase::new()
                .with_variable("log_bin", "OFF")
                .with_variable("binlog_format", "MIXED")
                .with_variable("binlog_row_image", "MINIMAL"),
        );
        let token = CancellationToken::new();

        let r = BinlogEnableCheck::new(db.clone(), "i").run(&token).await;
        assert!(r.is_failed());
        assert_eq!(r.error_msg(), "log_bin is OFF, and should be ON");

        let r = BinlogFormatCheck::new(db.clone(), "i").run(&token).await;
        assert_eq!(r.error_msg(), "binlog_format is MIXED, and should be ROW");
        assert_eq!(r.instruction(), "set global binlog_format=ROW;");

        assert!(BinlogRowImageCheck::new(db, "i").run(&token).await.is_failed());
    }

    #[tokio::test]
    async fn test_canceled_check_fails() {
        let db: Arc<dyn Database> =
            Arc::new(MockDatabase::new().with_variable("log_bin", "ON").with_delay(Duration::from_secs(30)));
        let token = CancellationToken::new();
        token.cancel();

        let r = BinlogEnableCheck::new(db, "i").run(&token).await;
        assert!(r.is_failed());
        assert!(r.error_msg().contains("canceled"));
    }
}
