//! Argument and result types for directory operations.
//!
//! Feed records stay untyped maps: field names and interpretations are owned
//! by the service and change over time, so the client forwards the caller's
//! field list and returns whatever comes back.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One feed as returned by `GetFeedInfo` and friends, keyed by field name.
pub type FeedRecord = BTreeMap<String, Value>;

/// Relationship used by `QueryFeeds` to compare a feed field with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "regexp")]
    Regexp,
}

impl QueryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryOperator::Less => "<",
            QueryOperator::Greater => ">",
            QueryOperator::LessOrEqual => "<=",
            QueryOperator::GreaterOrEqual => ">=",
            QueryOperator::NotEqual => "!=",
            QueryOperator::Equal => "=",
            QueryOperator::Like => "like",
            QueryOperator::Regexp => "regexp",
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "<" => Ok(QueryOperator::Less),
            ">" => Ok(QueryOperator::Greater),
            "<=" => Ok(QueryOperator::LessOrEqual),
            ">=" => Ok(QueryOperator::GreaterOrEqual),
            "!=" => Ok(QueryOperator::NotEqual),
            "=" => Ok(QueryOperator::Equal),
            "like" => Ok(QueryOperator::Like),
            "regexp" => Ok(QueryOperator::Regexp),
            other => Err(format!("unknown query operator {other:?}")),
        }
    }
}

/// Profile for `CreateUser`. Fields are sent in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Plaintext password for the new account; the service stores it.
    pub password: String,
    pub roles: String,
    pub options: String,
    pub email_site_info: bool,
    pub home_page: String,
    pub style_sheet: String,
    pub vcard: String,
}

impl NewUser {
    pub(crate) fn to_args(&self) -> Vec<Value> {
        vec![
            Value::from(&self.user_id),
            Value::from(&self.first_name),
            Value::from(&self.last_name),
            Value::from(&self.email),
            Value::from(&self.password),
            Value::from(&self.roles),
            Value::from(&self.options),
            Value::from(self.email_site_info),
            Value::from(&self.home_page),
            Value::from(&self.style_sheet),
            Value::from(&self.vcard),
        ]
    }
}
