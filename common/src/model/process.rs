use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::err::re_error::ReError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ErrorType {
    UnknownError = 0,
    ExecSQL = 1,
    CheckFailed = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessError {
    pub error_type: ErrorType,
    pub msg: String,
    /// Diagnostic payload, like the serialized pre-check results.
    #[serde(default)]
    pub raw_cause: String,
}

impl ProcessError {
    pub fn new<S: Into<String>>(error_type: ErrorType, msg: S) -> Self {
        ProcessError {
            error_type,
            msg: msg.into(),
            raw_cause: String::new(),
        }
    }

    pub fn with_raw_cause<S: Into<String>>(mut self, raw_cause: S) -> Self {
        self.raw_cause = raw_cause.into();
        self
    }

    pub fn from_error(error_type: ErrorType, err: &ReError) -> Self {
        ProcessError::new(error_type, err.to_string())
    }
}

/// Outcome of one `process`/`resume` invocation of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub is_canceled: bool,
    pub errors: Vec<ProcessError>,
    pub detail: Vec<u8>,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        !self.is_canceled && self.errors.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{ErrorType, ProcessError, ProcessResult};
    use crate::err::re_error::ReError;

    #[test]
    fn test_result() {
        assert!(ProcessResult::default().is_success());

        let err = ProcessError::from_error(ErrorType::ExecSQL, &ReError::MysqlQueryErr("lost".into()))
            .with_raw_cause("INSERT ...");
        assert_eq!(err.msg, "mysql query error: lost");
        assert_eq!(err.raw_cause, "INSERT ...");

        let result = ProcessResult {
            is_canceled: false,
            errors: vec![err],
            detail: vec![],
        };
        assert!(!result.is_success());
        assert_eq!(i32::from(ErrorType::CheckFailed), 2);
    }
}
