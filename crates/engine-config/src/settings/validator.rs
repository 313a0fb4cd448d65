use std::{collections::HashMap, fmt::Display, str::FromStr};
use url::Url;

use crate::settings::error::SettingsError;

/// Reads typed values out of an environment map, collecting every problem
/// instead of stopping at the first one.
pub struct EnvReader<'a> {
    env: &'a HashMap<String, String>,
    errors: Vec<String>,
}

impl<'a> EnvReader<'a> {
    pub fn new(env: &'a HashMap<String, String>) -> Self {
        Self {
            env,
            errors: Vec::new(),
        }
    }

    /// Trimmed value, `None` when unset or blank.
    pub fn optional(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn required(&mut self, key: &str) -> Option<String> {
        let value = self.optional(key);
        if value.is_none() {
            self.errors.push(SettingsError::Missing(key.to_string()).to_string());
        }
        value
    }

    pub fn invalid(&mut self, key: &str, value: &str, reason: impl Display) {
        self.errors.push(
            SettingsError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
            .to_string(),
        );
    }

    pub fn parse_optional<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.optional(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.invalid(key, &raw, e);
                None
            }
        }
    }

    pub fn parse_or<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        self.parse_optional(key).unwrap_or(default)
    }

    /// `true`/`false`, also accepting `1`/`0`, `yes`/`no`, `on`/`off`.
    pub fn flag(&mut self, key: &str, default: bool) -> bool {
        let Some(raw) = self.optional(key) else {
            return default;
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                self.invalid(key, &raw, "expected true or false");
                default
            }
        }
    }

    pub fn positive(&mut self, key: &str, default: u64) -> u64 {
        let raw = self.optional(key);
        let value = self.parse_or(key, default);
        if value == 0 {
            self.invalid(key, raw.as_deref().unwrap_or("0"), "must be greater than zero");
            return default;
        }
        value
    }

    pub fn url(&mut self, key: &str) -> Option<String> {
        let raw = self.optional(key)?;
        match Url::parse(&raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(raw),
            Ok(url) => {
                self.invalid(key, &raw, format!("unsupported scheme {}", url.scheme()));
                None
            }
            Err(e) => {
                self.invalid(key, &raw, e);
                None
            }
        }
    }

    /// Comma-separated addresses; each must look like `local@domain`.
    pub fn mailboxes(&mut self, key: &str) -> Option<Vec<String>> {
        let raw = self.optional(key)?;
        let addresses: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect();

        let bad: Vec<&str> = addresses
            .iter()
            .map(String::as_str)
            .filter(|address| !looks_like_mailbox(address))
            .collect();
        if !bad.is_empty() || addresses.is_empty() {
            let reason = format!("not an email address: {}", bad.join(", "));
            self.invalid(key, &raw, reason);
            return None;
        }
        Some(addresses)
    }

    pub fn finish(self) -> Result<(), SettingsError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::ValidationFailed(self.errors))
        }
    }
}

/// Accepts `user@host` and `Name <user@host>`.
fn looks_like_mailbox(address: &str) -> bool {
    let address = match (address.find('<'), address.rfind('>')) {
        (Some(open), Some(close)) if open < close => &address[open + 1..close],
        _ => address,
    };
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !address.contains(' ')
        }
        None => false,
    }
}
