//! HTTP Basic credentials for `multichaind`, stored only in their encoded form.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::header::HeaderValue;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: Arc<str>,
}

impl Credentials {
    pub fn new(user: &str, password: &str) -> Self {
        let credentials = format!("{user}:{password}");
        Self {
            token: BASE64_STANDARD.encode(credentials).into(),
        }
    }

    /// The base64 token placed after `Basic `.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Basic {}", self.token))
            .context("failed to build Authorization header")?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}
