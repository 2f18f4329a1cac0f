use std::io;

use thiserror::Error;

use crate::model::stage::Stage;

#[derive(Debug, Error)]
pub enum ReError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),

    #[error("{0}")]
    String(String),

    /// A `~` rule that is not a valid regular expression. Raised while a rule set
    /// is compiled, never while a table is matched.
    #[error("invalid rule pattern `{pattern}`: {source}")]
    InvalidRulePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("config file parse error: {0}")]
    ConfigFileParseErr(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("mysql query error: {0}")]
    MysqlQueryErr(String),

    #[error("sql parse error: {0}")]
    SqlParseErr(String),

    #[error("invalid replication event type {0}")]
    InvalidEventType(String),

    #[error("route error: {0}")]
    RouteErr(String),

    #[error("invalid stage transition: {op} in stage {stage}")]
    InvalidStage { op: String, stage: Stage },

    #[error("sub task {0} not found")]
    SubTaskNotFound(String),

    #[error("sub task {0} already exists")]
    SubTaskExists(String),

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("serialize error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("{0} canceled")]
    Canceled(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    /// Error wrapped with the context it was raised in, like the SQL text of an event.
    #[error("{context}: {source}")]
    Annotated {
        context: String,
        #[source]
        source: Box<ReError>,
    },
}

impl ReError {
    /// Wraps the error with `context`.
    pub fn annotate<S: Into<String>>(self, context: S) -> ReError {
        ReError::Annotated {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error under any number of annotations.
    pub fn root(&self) -> &ReError {
        match self {
            ReError::Annotated { source, .. } => source.root(),
            other => other,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ReError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        ReError::Lock(error.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::ReError;

    #[test]
    fn test_annotate() {
        let err = ReError::InvalidEventType("TABLE_MAP_EVENT".to_string())
            .annotate("skip row event on `db`.`tbl`");

        assert_eq!(
            err.to_string(),
            "skip row event on `db`.`tbl`: invalid replication event type TABLE_MAP_EVENT"
        );
        assert!(matches!(err.root(), ReError::InvalidEventType(_)));
    }
}
