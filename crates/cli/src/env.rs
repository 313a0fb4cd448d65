use crate::error::CliError;
use engine_config::settings::keys;
use std::{collections::HashMap, fs, path::Path};

/// Process environment layered over an optional `.env` file.
///
/// Variables already present in the process environment win over the file.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Merge `path` in. A missing default `.env` is not an error, an
    /// explicitly requested file is.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P, required: bool) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(CliError::Config(format!(
                    "Failed to read env file {}: {e}",
                    path.display()
                )));
            }
        };

        for (key, value) in parse_env_content(&content)? {
            self.vars.entry(key).or_insert(value);
        }
        Ok(())
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// Configured pipeline keys with secret values masked, for `--verbose` style dumps.
    pub fn redacted(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .vars
            .iter()
            .filter(|(key, _)| is_pipeline_key(key))
            .map(|(key, value)| {
                let shown = if keys::SECRETS.contains(&key.as_str()) {
                    "********".to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect();
        pairs.sort();
        pairs
    }
}

fn is_pipeline_key(key: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "EE_", "SENSOR", "LOOKBACK_", "RUN_", "GDRIVE_", "EXPORT", "ZOI_", "WATERMARK_", "STATE_",
        "DB_", "WEBHOOK_", "SMTP_", "EMAIL_",
    ];
    PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

fn parse_env_content(content: &str) -> Result<Vec<(String, String)>, CliError> {
    let mut pairs = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid env file: malformed line {} (expected KEY=VALUE)",
                line_num + 1
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Config(format!(
                "Invalid env file: empty key at line {}",
                line_num + 1
            )));
        }
        pairs.push((key.to_string(), unquote_value(value)));
    }
    Ok(pairs)
}

fn unquote_value(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
