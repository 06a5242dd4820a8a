use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse-endpoint mode, per the `mode` field of the request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Auto,
    Json,
    Query,
    Kv,
    Csv,
    Deepseek,
    Ecom,
    News,
    Social,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Json => "json",
            Mode::Query => "query",
            Mode::Kv => "kv",
            Mode::Csv => "csv",
            Mode::Deepseek => "deepseek",
            Mode::Ecom => "ecom",
            Mode::News => "news",
            Mode::Social => "social",
        }
    }

    /// The contract used to validate this mode's upstream JSON output.
    /// `deepseek` validates against the `core` contract (spec.md §4.10).
    pub fn contract_key(self) -> &'static str {
        match self {
            Mode::Deepseek => "core",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Mode {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "auto" => Mode::Auto,
            "json" => Mode::Json,
            "query" => Mode::Query,
            "kv" => Mode::Kv,
            "csv" => Mode::Csv,
            "deepseek" => Mode::Deepseek,
            "ecom" => Mode::Ecom,
            "news" => Mode::News,
            "social" => Mode::Social,
            _ => return Err(()),
        })
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Mode::try_from(raw.as_str())
            .map_err(|_| serde::de::Error::custom(format!("unknown mode: {raw}")))
    }
}

/// Normalized `target_lang`. `None` means unset; `Zh` means Chinese,
/// accepting the aliases documented in spec.md §3 at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLang {
    Zh,
}

impl TargetLang {
    /// Normalize a caller-supplied alias. Returns `Ok(None)` for empty
    /// input, `Ok(Some(Zh))` for a recognized Chinese alias, and `Err(())`
    /// for anything else (caller surfaces `invalid_target_lang`).
    pub fn normalize(raw: &str) -> Result<Option<TargetLang>, ()> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh-hans" | "cn" => Ok(Some(TargetLang::Zh)),
            _ => Err(()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetLang::Zh => "zh",
        }
    }
}
