//! Translation table completeness validation.
//!
//! The default locale's table defines the key set. Every other table must
//! carry the same leaf keys, with non-empty strings and the same
//! `{placeholder}` names.

use crate::i18n::TranslationTable;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Errors and warnings found when comparing two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletenessReport {
    /// Keys missing from the translated table, empty leaves, placeholder mismatches
    pub errors: Vec<String>,

    /// Keys the translated table has that the default table doesn't
    pub warnings: Vec<String>,
}

impl CompletenessReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for CompletenessReport {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CompletenessValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl CompletenessValidator {
    /// Compare `translated` against the authoritative `default` table.
    pub fn validate(default: &TranslationTable, translated: &TranslationTable) -> CompletenessReport {
        let mut report = CompletenessReport::new();
        let locale = translated.locale();

        let default_keys: BTreeSet<String> = default.key_paths().into_iter().collect();
        let translated_keys: BTreeSet<String> = translated.key_paths().into_iter().collect();

        for key in default_keys.difference(&translated_keys) {
            report
                .errors
                .push(format!("[{}] missing key: {}", locale, key));
        }

        for key in translated_keys.difference(&default_keys) {
            report
                .warnings
                .push(format!("[{}] extra key: {}", locale, key));
        }

        for key in default_keys.intersection(&translated_keys) {
            let (Some(source), Some(target)) = (default.get(key), translated.get(key)) else {
                report
                    .errors
                    .push(format!("[{}] non-string value at: {}", locale, key));
                continue;
            };

            if target.trim().is_empty() {
                report
                    .errors
                    .push(format!("[{}] empty string at: {}", locale, key));
                continue;
            }

            let expected = Self::extract_placeholders(source);
            let actual = Self::extract_placeholders(target);
            if expected != actual {
                report.errors.push(format!(
                    "[{}] placeholder mismatch at {}: expected {:?}, found {:?}",
                    locale, key, expected, actual
                ));
            }
        }

        report
    }

    /// Extract `{name}` placeholders, deduplicated and sorted.
    fn extract_placeholders(text: &str) -> BTreeSet<String> {
        let regex = PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{([a-zA-Z_]+)\}").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}
