use regex::Regex;

use common::err::re_error::ReError;
use common::err::CResult;

/// Case-insensitive wildcard pattern: `*` is any run of characters, `?` exactly one.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> CResult<Glob> {
        let expr = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
        let regex = Regex::new(&format!("(?i)^{}$", expr)).map_err(|e| ReError::InvalidRulePattern {
            pattern: pattern.to_string(),
            source: e,
        })?;

        Ok(Glob {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}
