use crate::err::re_error::ReError;

pub mod re_error;

pub type CResult<T> = Result<T, ReError>;
