//! Pattern configuration.
//!
//! Tier tables and substitution tables for both target fields. The defaults
//! are the tables the extractor ships with; a TOML file of the same shape
//! replaces them wholesale:
//!
//! ```toml
//! [[asset_id.tiers]]
//! name = "Exact"
//! pattern = '\b[A-Z]+-?\d{5}-\d+'
//!
//! [[asset_id.substitutions]]
//! from = "O"
//! to = "0"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub asset_id: FieldPatterns,
    pub serial_number: FieldPatterns,
}

/// Ordered tiers plus the substitution table for one target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPatterns {
    pub tiers: Vec<TierSpec>,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub name: String,
    pub pattern: String,
    /// Apply the substitution table to the scanning text before this tier.
    #[serde(default)]
    pub normalize: bool,
    /// Matches are fragments that need stitching to a neighbouring word.
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl TierSpec {
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            normalize: false,
            partial: false,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }
}

impl Substitution {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

fn digit_lookalikes() -> Vec<Substitution> {
    vec![Substitution::new("O", "0"), Substitution::new("o", "0")]
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            asset_id: FieldPatterns {
                tiers: vec![
                    // ATAPL-70150-00006, ATAPL66943-004
                    TierSpec::new("Exact", r"\b[A-Z]+-?\d{5}-\d+"),
                    // ATAPL-66662-O001
                    TierSpec::new("Exact Num Replace", r"\b[A-Z]+-\d{5}-\d+").normalized(),
                    // ATAPL-78438 00002
                    TierSpec::new("Spaced", r"\b[A-Z]{5}-?\d{5} ?\d+"),
                    // ATAPL67, ATAPL-58337
                    TierSpec::new("Partial Start", r"\b[A-Z]{5}-?\d+-?").partial(),
                    // 58320-00003
                    TierSpec::new("Partial End", r"\d{5}-?\d{5}"),
                ],
                substitutions: digit_lookalikes(),
            },
            serial_number: FieldPatterns {
                tiers: vec![
                    TierSpec::new("Exact", r"\b\d{2}-\d{5}"),
                    // SN:, SN :, SN :
                    TierSpec::new("Partial Start", r"\bSN ?: ?").partial(),
                    TierSpec::new("Poor", r" \d{3} "),
                ],
                substitutions: digit_lookalikes(),
            },
        }
    }
}

impl PatternConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(Error::io(path))?;
        Self::from_toml(&source)
    }
}
