//! Validation and escaping of caller-supplied filter values.
//!
//! Every string that ends up inside a query literal goes through
//! [`FilterValue`]. The resulting [`SafeFragment`] is already quoted and can
//! only be constructed here.

use std::fmt;

use crate::error::{Error, Result};

/// Default maximum length of a filter value, in characters
pub const DEFAULT_MAX_FILTER_LEN: usize = 500;

/// A quoted SQL literal built from validated caller input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeFragment {
    literal: String,
    pattern: bool,
}

impl SafeFragment {
    /// The quoted literal, ready for interpolation
    pub fn as_sql(&self) -> &str {
        &self.literal
    }

    /// Whether this is a LIKE pattern that needs an `ESCAPE '\'` clause
    pub fn is_pattern(&self) -> bool {
        self.pattern
    }
}

impl fmt::Display for SafeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// Validator for values interpolated into query predicates
#[derive(Debug, Clone, Copy)]
pub struct FilterValue {
    max_len: usize,
}

impl Default for FilterValue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILTER_LEN)
    }
}

impl FilterValue {
    /// Create a validator with a maximum value length
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Substring match: `'%<value>%'` with quotes doubled and LIKE
    /// metacharacters (`\`, `%`, `_`) escaped with a backslash.
    pub fn contains(&self, name: &str, raw: &str) -> Result<SafeFragment> {
        self.check_common(name, raw)?;

        let mut literal = String::with_capacity(raw.len() + 4);
        literal.push_str("'%");
        for c in raw.chars() {
            match c {
                '\'' => literal.push_str("''"),
                '\\' | '%' | '_' => {
                    literal.push('\\');
                    literal.push(c);
                }
                _ => literal.push(c),
            }
        }
        literal.push_str("%'");

        Ok(SafeFragment {
            literal,
            pattern: true,
        })
    }

    /// Exact identifier (trace or span ID): ASCII alphanumerics, `-` and `_` only
    pub fn identifier(&self, name: &str, raw: &str) -> Result<SafeFragment> {
        self.check_common(name, raw)?;

        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(Error::invalid_parameter(
                name,
                format!(
                    "unexpected character {bad:?}; \
                     identifiers may only contain letters, digits, '-' and '_'"
                ),
            ));
        }

        Ok(SafeFragment {
            literal: format!("'{raw}'"),
            pattern: false,
        })
    }

    fn check_common(&self, name: &str, raw: &str) -> Result<()> {
        if raw.is_empty() {
            return Err(Error::invalid_parameter(name, "must not be empty"));
        }

        let len = raw.chars().count();
        if len > self.max_len {
            return Err(Error::invalid_parameter(
                name,
                format!("{len} characters exceeds the maximum of {}", self.max_len),
            ));
        }

        if raw.contains('\0') {
            return Err(Error::invalid_parameter(name, "must not contain NUL bytes"));
        }

        Ok(())
    }
}
