//! Nested string tables per locale.
//!
//! Tables live in `locales/<code>.json` and are embedded at compile time.
//! Keys are addressed with dot paths (`"contact.submit"`). The default
//! locale's table is the authoritative key set; see `validator`.

use crate::i18n::Locale;
use serde_json::Value;
use std::sync::OnceLock;

const EN_TABLE: &str = include_str!("../../locales/en.json");
const KO_TABLE: &str = include_str!("../../locales/ko.json");

#[derive(Debug, Clone)]
pub struct TranslationTable {
    locale: Locale,
    root: Value,
}

static TABLES: OnceLock<Vec<TranslationTable>> = OnceLock::new();

fn tables() -> &'static [TranslationTable] {
    TABLES.get_or_init(|| {
        vec![
            TranslationTable::parse(Locale::EN, EN_TABLE)
                .expect("embedded en.json must be a valid JSON object"),
            TranslationTable::parse(Locale::KO, KO_TABLE)
                .expect("embedded ko.json must be a valid JSON object"),
        ]
    })
}

/// The full string table for `locale`. Locales without a table get the
/// default locale's.
pub fn translate(locale: Locale) -> &'static TranslationTable {
    let tables = tables();
    tables
        .iter()
        .find(|table| table.locale == locale)
        .or_else(|| tables.iter().find(|t| t.locale == Locale::default_locale()))
        .unwrap_or(&tables[0])
}

/// Table lookup by raw code; unknown codes fall back to the default locale.
pub fn translate_code(code: &str) -> &'static TranslationTable {
    translate(Locale::from_code_or_default(code))
}

impl TranslationTable {
    pub fn parse(locale: Locale, json: &str) -> serde_json::Result<Self> {
        let root: Value = serde_json::from_str(json)?;
        if !root.is_object() {
            return Err(serde::de::Error::custom("translation table must be an object"));
        }
        Ok(Self { locale, root })
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// The raw nested table (served by `/api/translations/:locale`).
    pub fn as_json(&self) -> &Value {
        &self.root
    }

    /// Look up a leaf string by dot path.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut current = &self.root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        current.as_str()
    }

    /// Look up `key`, falling back to the default locale and then to the
    /// key itself.
    pub fn t(&self, key: &str) -> String {
        if let Some(value) = self.get(key) {
            return value.to_string();
        }
        let default = Locale::default_locale();
        if self.locale != default {
            if let Some(value) = translate(default).get(key) {
                return value.to_string();
            }
        }
        key.to_string()
    }

    /// `t` with `{name}` placeholders substituted.
    pub fn t_with(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let mut text = self.t(key);
        for (name, value) in vars {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }

    /// Every leaf key path in the table, sorted.
    pub fn key_paths(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_leaf_paths(&self.root, String::new(), &mut keys);
        keys.sort();
        keys
    }
}

fn collect_leaf_paths(value: &Value, prefix: String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_leaf_paths(child, path, out);
            }
        }
        _ => out.push(prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(locale: Locale, value: Value) -> TranslationTable {
        TranslationTable::parse(locale, &value.to_string()).unwrap()
    }

    // ==================== Embedded Tables ====================

    #[test]
    fn test_embedded_tables_parse() {
        assert_eq!(translate(Locale::EN).locale(), Locale::EN);
        assert_eq!(translate(Locale::KO).locale(), Locale::KO);
    }

    #[test]
    fn test_translate_code_falls_back_to_english() {
        assert_eq!(translate_code("ko").locale(), Locale::KO);
        assert_eq!(translate_code("de").locale(), Locale::EN);
        assert_eq!(translate_code("").locale(), Locale::EN);
    }

    #[test]
    fn test_known_strings() {
        assert_eq!(translate(Locale::EN).get("nav.pricing"), Some("Pricing"));
        assert_eq!(translate(Locale::KO).get("nav.pricing"), Some("요금제"));
        assert_eq!(translate(Locale::KO).get("meta.switchLanguage"), Some("English"));
    }

    // ==================== Lookup ====================

    #[test]
    fn test_get_nested_and_missing() {
        let t = table(Locale::EN, json!({"a": {"b": "deep"}, "top": "x"}));
        assert_eq!(t.get("a.b"), Some("deep"));
        assert_eq!(t.get("top"), Some("x"));
        assert_eq!(t.get("a"), None); // not a leaf string
        assert_eq!(t.get("a.c"), None);
    }

    #[test]
    fn test_t_falls_back_to_key() {
        let t = table(Locale::EN, json!({}));
        assert_eq!(t.t("missing.key"), "missing.key");
    }

    #[test]
    fn test_t_falls_back_to_default_locale() {
        let t = table(Locale::KO, json!({}));
        assert_eq!(t.t("nav.contact"), "Contact");
    }

    #[test]
    fn test_t_with_placeholders() {
        let t = translate(Locale::KO);
        assert_eq!(
            t.t_with("email.confirmation.greeting", &[("name", "김민수")]),
            "김민수님, 안녕하세요."
        );
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(TranslationTable::parse(Locale::EN, "[]").is_err());
        assert!(TranslationTable::parse(Locale::EN, "{not json").is_err());
    }

    // ==================== Key Paths ====================

    #[test]
    fn test_key_paths_sorted_leaves() {
        let t = table(Locale::EN, json!({"b": "1", "a": {"y": "2", "x": "3"}}));
        assert_eq!(t.key_paths(), vec!["a.x", "a.y", "b"]);
    }
}
