//! Asset ID and serial number extraction.
//!
//! Each field owns an ordered list of regex tiers. The first tier with any
//! match wins and later tiers are never run. Tiers flagged `normalize` swap
//! OCR lookalikes (`O` for `0`) in the scanning text first, and that swap
//! carries over to every tier after it. Tiers flagged `partial` only catch
//! the leading fragment of an identifier, so their matches are stitched to
//! the neighbouring word box (see [`stitch`]).

pub mod stitch;

use regex::Regex;
use tracing::instrument;

pub use stitch::{complete_fragments, nearest_following};

use crate::{
    config::{FieldPatterns, PatternConfig, Substitution},
    AnnotationRecord, Error, Result,
};

/// `match_type` reported when no tier matched.
pub const NO_MATCH: &str = "No";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AssetId,
    SerialNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub match_type: String,
    pub matches: Vec<String>,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            match_type: NO_MATCH.to_string(),
            matches: Vec::new(),
        }
    }

    /// A partial tier can win and still stitch nothing, so this looks at the
    /// matches rather than the tag.
    pub fn is_match(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Tier {
    pub name: String,
    pub pattern: Regex,
    pub normalize: bool,
    pub partial: bool,
}

/// Compiled tiers for one field, in priority order.
#[derive(Debug, Clone)]
pub struct TierList {
    tiers: Vec<Tier>,
    substitutions: Vec<Substitution>,
}

impl TierList {
    pub fn compile(patterns: &FieldPatterns) -> Result<Self> {
        let tiers = patterns
            .tiers
            .iter()
            .map(|spec| {
                let pattern = Regex::new(&spec.pattern).map_err(|source| Error::Pattern {
                    tier: spec.name.clone(),
                    source,
                })?;
                Ok(Tier {
                    name: spec.name.clone(),
                    pattern,
                    normalize: spec.normalize,
                    partial: spec.partial,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            tiers,
            substitutions: patterns.substitutions.clone(),
        })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Runs the tiers over `record` and returns the winning tier's matches.
    pub fn extract(&self, record: &AnnotationRecord) -> MatchResult {
        let mut text = ScanText::from_record(record);
        for tier in &self.tiers {
            text = text.prepare(tier, &self.substitutions);
            let found: Vec<&str> = tier
                .pattern
                .find_iter(text.as_str())
                .map(|m| m.as_str())
                .collect();
            if found.is_empty() {
                continue;
            }

            let matches = if tier.partial {
                let fragments: Vec<&str> = found.iter().map(|m| m.trim()).collect();
                let stitched = complete_fragments(&fragments, record.words());
                if stitched.is_empty() {
                    log::debug!(
                        "Tier {:?} matched {fragments:?} in {} but no word contains them",
                        tier.name,
                        record.image_name()
                    );
                }
                stitched
            } else {
                found.into_iter().map(str::to_string).collect()
            };

            return MatchResult {
                match_type: tier.name.clone(),
                matches,
            };
        }
        MatchResult::none()
    }
}

/// Single-line scanning text, threaded through the tiers of one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanText {
    text: String,
    normalized: bool,
}

impl ScanText {
    pub fn from_record(record: &AnnotationRecord) -> Self {
        Self {
            text: record.complete_text().replace('\n', " "),
            normalized: false,
        }
    }

    /// The text `tier` should scan. Once normalized the text stays that way,
    /// and the table is applied at most once.
    pub fn prepare(self, tier: &Tier, substitutions: &[Substitution]) -> Self {
        if !tier.normalize || self.normalized {
            return self;
        }
        let text = substitutions
            .iter()
            .fold(self.text, |text, sub| text.replace(&sub.from, &sub.to));
        Self {
            text,
            normalized: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub asset_id: MatchResult,
    pub serial_number: MatchResult,
}

#[derive(Debug, Clone)]
pub struct PatternExtractor {
    asset_id: TierList,
    serial_number: TierList,
}

impl PatternExtractor {
    pub fn new(config: &PatternConfig) -> Result<Self> {
        Ok(Self {
            asset_id: TierList::compile(&config.asset_id)?,
            serial_number: TierList::compile(&config.serial_number)?,
        })
    }

    pub fn tiers(&self, field: Field) -> &TierList {
        match field {
            Field::AssetId => &self.asset_id,
            Field::SerialNumber => &self.serial_number,
        }
    }

    pub fn extract_field(&self, record: &AnnotationRecord, field: Field) -> MatchResult {
        self.tiers(field).extract(record)
    }

    #[instrument(level = "debug", skip_all, fields(image = record.image_name()))]
    pub fn extract(&self, record: &AnnotationRecord) -> Extraction {
        Extraction {
            asset_id: self.extract_field(record, Field::AssetId),
            serial_number: self.extract_field(record, Field::SerialNumber),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{config::TierSpec, FileInfo, Point, WordBox};

    fn record(words: &[(&str, i32, i32)]) -> AnnotationRecord {
        let words = words
            .iter()
            .map(|&(text, x, y)| {
                let width = 12 * text.len() as i32;
                WordBox {
                    confidence: 0.8,
                    text: text.to_string(),
                    bounding_poly: [
                        Point(x, y),
                        Point(x + width, y),
                        Point(x + width, y + 24),
                        Point(x, y + 24),
                    ],
                    symbols: Vec::new(),
                }
            })
            .collect();
        let info = FileInfo {
            width: 2048,
            height: 1536,
            image_dir_path: PathBuf::from("images"),
            image_name: "label.jpg".into(),
        };
        AnnotationRecord::new(info, words)
    }

    fn extractor() -> PatternExtractor {
        PatternExtractor::new(&PatternConfig::default()).unwrap()
    }

    fn tier_list(tiers: Vec<TierSpec>, substitutions: Vec<Substitution>) -> TierList {
        TierList::compile(&FieldPatterns {
            tiers,
            substitutions,
        })
        .unwrap()
    }

    #[test]
    fn exact_asset_id() {
        let result = extractor().extract_field(
            &record(&[("ATAPL-70150-00006", 0, 0)]),
            Field::AssetId,
        );
        assert_eq!(result.match_type, "Exact");
        assert_eq!(result.matches, ["ATAPL-70150-00006"]);
    }

    #[test]
    fn lookalike_letters_fall_through_to_num_replace() {
        let result = extractor().extract_field(
            &record(&[("ATAPL-66662-O001", 0, 0)]),
            Field::AssetId,
        );
        assert_eq!(result.match_type, "Exact Num Replace");
        assert_eq!(result.matches, ["ATAPL-66662-0001"]);
    }

    #[test]
    fn spaced_asset_id() {
        let result = extractor().extract_field(
            &record(&[("ATAPL-78438", 0, 0), ("00002", 200, 0)]),
            Field::AssetId,
        );
        assert_eq!(result.match_type, "Spaced");
        assert_eq!(result.matches, ["ATAPL-78438 00002"]);
    }

    #[test]
    fn partial_start_is_stitched() {
        let result = extractor().extract_field(
            &record(&[("PROPERTY", 0, 0), ("ATAPL67", 0, 100), ("890", 90, 102)]),
            Field::AssetId,
        );
        assert_eq!(result.match_type, "Partial Start");
        assert_eq!(result.matches, ["ATAPL67890"]);
    }

    #[test]
    fn partial_end_is_not_stitched() {
        let result =
            extractor().extract_field(&record(&[("58320-00003", 0, 0)]), Field::AssetId);
        assert_eq!(result.match_type, "Partial End");
        assert_eq!(result.matches, ["58320-00003"]);
    }

    #[test]
    fn serial_prefers_exact_over_label() {
        let result = extractor().extract_field(
            &record(&[("SN : 16-50122", 0, 0)]),
            Field::SerialNumber,
        );
        assert_eq!(result.match_type, "Exact");
        assert_eq!(result.matches, ["16-50122"]);
    }

    #[test]
    fn serial_label_is_stitched_to_its_value() {
        let result = extractor().extract_field(
            &record(&[("SN:", 0, 0), ("A1234", 40, 0)]),
            Field::SerialNumber,
        );
        assert_eq!(result.match_type, "Partial Start");
        assert_eq!(result.matches, ["SN:A1234"]);
    }

    #[test]
    fn poor_serial_needs_surrounding_spaces() {
        let result = extractor().extract_field(
            &record(&[("MODEL", 0, 0), ("125", 100, 0), ("X", 200, 0)]),
            Field::SerialNumber,
        );
        assert_eq!(result.match_type, "Poor");
        assert_eq!(result.matches, [" 125 "]);
    }

    #[test]
    fn empty_record_matches_nothing() {
        let extraction = extractor().extract(&record(&[]));
        assert_eq!(extraction.asset_id, MatchResult::none());
        assert_eq!(extraction.serial_number, MatchResult::none());
    }

    #[test]
    fn collects_every_match_of_the_winning_tier() {
        let result = extractor().extract_field(
            &record(&[("ATAPL-70150-00006", 0, 0), ("ATAPL66943-004", 0, 50)]),
            Field::AssetId,
        );
        assert_eq!(result.matches, ["ATAPL-70150-00006", "ATAPL66943-004"]);
    }

    #[test]
    fn first_matching_tier_wins() {
        let tiers = tier_list(
            vec![
                TierSpec::new("Digits", r"\d{3}"),
                TierSpec::new("Anything", r"\S+"),
            ],
            Vec::new(),
        );
        let result = tiers.extract(&record(&[("abc", 0, 0), ("123", 50, 0)]));
        assert_eq!(result.match_type, "Digits");
        assert_eq!(result.matches, ["123"]);
    }

    #[test]
    fn normalization_carries_into_later_tiers() {
        let tiers = tier_list(
            vec![
                TierSpec::new("Never", r"^$").normalized(),
                TierSpec::new("Zeros", r"1\d\d"),
            ],
            vec![Substitution::new("O", "0"), Substitution::new("o", "0")],
        );
        let result = tiers.extract(&record(&[("1Oo", 0, 0)]));
        assert_eq!(result.match_type, "Zeros");
        assert_eq!(result.matches, ["100"]);
    }

    #[test]
    fn tiers_before_normalization_see_raw_text() {
        let tiers = tier_list(
            vec![
                TierSpec::new("Raw", r"1Oo"),
                TierSpec::new("Zeros", r"100").normalized(),
            ],
            vec![Substitution::new("O", "0"), Substitution::new("o", "0")],
        );
        let result = tiers.extract(&record(&[("1Oo", 0, 0)]));
        assert_eq!(result.match_type, "Raw");
    }

    #[test]
    fn substitution_table_applies_once() {
        let tier = Tier {
            name: "Chain".into(),
            pattern: Regex::new(".").unwrap(),
            normalize: true,
            partial: false,
        };
        let table = [Substitution::new("a", "b"), Substitution::new("b", "c")];
        let text = ScanText {
            text: "a".into(),
            normalized: false,
        };
        let text = text.prepare(&tier, &table);
        assert_eq!(text.as_str(), "c");
        assert!(text.is_normalized());
        let text = text.prepare(&tier, &table);
        assert_eq!(text.as_str(), "c");
    }

    #[test]
    fn partial_tier_without_anchor_keeps_its_tag() {
        // Normalization rewrites the fragment so it no longer occurs in any
        // word box.
        let tiers = tier_list(
            vec![
                TierSpec::new("Fix", r"^$").normalized(),
                TierSpec::new("Start", r"\bAB\d+").partial(),
            ],
            vec![Substitution::new("O", "0")],
        );
        let result = tiers.extract(&record(&[("AB1O", 0, 0), ("7", 60, 0)]));
        assert_eq!(result.match_type, "Start");
        assert!(result.matches.is_empty());
        assert!(!result.is_match());
    }

    #[test]
    fn bad_pattern_names_its_tier() {
        let err = TierList::compile(&FieldPatterns {
            tiers: vec![TierSpec::new("Broken", r"(")],
            substitutions: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::Pattern { ref tier, .. } if tier == "Broken"));
    }
}
