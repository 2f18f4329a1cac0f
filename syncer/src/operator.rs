use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::info;

use common::err::re_error::ReError;
use common::err::CResult;
use common::model::rpc::SqlOp;

use crate::event::BinlogPosition;

/// Manual intervention on one query event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Skip,
    /// Run these statements instead of the original one.
    Replace(Vec<String>),
}

/// Pending operators keyed by the position of their query event. Each one applies once.
#[derive(Debug, Default)]
pub struct OperatorHolder {
    operators: Mutex<HashMap<BinlogPosition, Operator>>,
}

impl OperatorHolder {
    pub fn new() -> Self {
        OperatorHolder::default()
    }

    /// Registers an operator, replacing any earlier one on the same position.
    pub fn set(&self, op: SqlOp, args: Vec<String>, binlog_pos: &str) -> CResult<()> {
        let pos = BinlogPosition::from_str(binlog_pos)?;
        let operator = match op {
            SqlOp::Skip => Operator::Skip,
            SqlOp::Replace if args.is_empty() => {
                return Err(ReError::String(format!("replace on {} needs at least one statement", pos)));
            }
            SqlOp::Replace => Operator::Replace(args),
        };

        info!("set sql operator {:?} on {}", operator, pos);
        self.operators.lock()?.insert(pos, operator);
        Ok(())
    }

    /// Removes and returns the operator of `pos`.
    pub fn take(&self, pos: &BinlogPosition) -> CResult<Option<Operator>> {
        Ok(self.operators.lock()?.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.operators.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
