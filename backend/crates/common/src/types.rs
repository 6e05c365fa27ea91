use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Third-party integration a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Ghl,
    Meta,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ghl => "ghl",
            Provider::Meta => "meta",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stored credential authenticates against its provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    OAuth,
    ApiKey,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::OAuth => "oauth",
            AuthType::ApiKey => "api_key",
        }
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth" | "oauth2" => Ok(AuthType::OAuth),
            "api_key" | "apikey" | "private" => Ok(AuthType::ApiKey),
            other => Err(format!("unknown auth type: {other}")),
        }
    }
}
