//! Locale type: a copyable, registry-validated locale.

use crate::i18n::{LocaleConfig, LocaleRegistry};
use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locale {
    code: &'static str,
}

impl Locale {
    pub const EN: Locale = Locale { code: "en" };
    pub const KO: Locale = Locale { code: "ko" };

    /// Create a Locale from a language tag.
    ///
    /// # Returns
    /// * `Ok(Locale)` if the code is registered and enabled
    /// * `Err` if the code is unknown or disabled
    pub fn from_code(code: &str) -> Result<Locale> {
        match LocaleRegistry::get().get_by_code(code) {
            Some(config) if config.enabled => Ok(Locale { code: config.code }),
            Some(_) => bail!("Locale '{}' is not enabled", code),
            None => bail!("Unknown locale code: '{}'", code),
        }
    }

    /// Like `from_code`, but unknown codes resolve to the default locale.
    pub fn from_code_or_default(code: &str) -> Locale {
        Self::from_code(code).unwrap_or_else(|_| Self::default_locale())
    }

    pub fn default_locale() -> Locale {
        Locale {
            code: LocaleRegistry::get().default_locale().code,
        }
    }

    /// Every enabled locale, default first.
    pub fn all() -> Vec<Locale> {
        LocaleRegistry::get()
            .list_enabled()
            .into_iter()
            .map(|config| Locale { code: config.code })
            .collect()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// # Panics
    /// Never for values built through this type's constructors.
    pub fn config(&self) -> &'static LocaleConfig {
        LocaleRegistry::get()
            .get_by_code(self.code)
            .expect("Locale code should always be valid")
    }

    /// URL prefix for this locale ("" for the default locale).
    pub fn prefix(&self) -> &'static str {
        self.config().url_prefix
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn is_default(&self) -> bool {
        self.config().is_default
    }

    /// The locale a language toggle switches to. With two locales this is
    /// simply the other one.
    pub fn other(&self) -> Locale {
        Locale::all()
            .into_iter()
            .find(|locale| locale != self)
            .unwrap_or(*self)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::default_locale()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Locale::from_code(&code).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Constructor Tests ====================

    #[test]
    fn test_constants() {
        assert_eq!(Locale::EN.code(), "en");
        assert_eq!(Locale::KO.code(), "ko");
        assert!(Locale::EN.is_default());
        assert!(!Locale::KO.is_default());
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Locale::from_code("ko").unwrap(), Locale::KO);
        let err = Locale::from_code("ja").unwrap_err();
        assert!(err.to_string().contains("Unknown"));
        assert!(Locale::from_code("").is_err());
    }

    #[test]
    fn test_from_code_or_default() {
        assert_eq!(Locale::from_code_or_default("ko"), Locale::KO);
        assert_eq!(Locale::from_code_or_default("zz"), Locale::EN);
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(Locale::default(), Locale::EN);
    }

    // ==================== Accessor Tests ====================

    #[test]
    fn test_prefix() {
        assert_eq!(Locale::EN.prefix(), "");
        assert_eq!(Locale::KO.prefix(), "/ko");
    }

    #[test]
    fn test_other() {
        assert_eq!(Locale::EN.other(), Locale::KO);
        assert_eq!(Locale::KO.other(), Locale::EN);
    }

    #[test]
    fn test_all_lists_both() {
        assert_eq!(Locale::all(), vec![Locale::EN, Locale::KO]);
    }

    // ==================== Serde Tests ====================

    #[test]
    fn test_serde_as_code() {
        assert_eq!(serde_json::to_string(&Locale::KO).unwrap(), "\"ko\"");
        let parsed: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Locale::EN);
        assert!(serde_json::from_str::<Locale>("\"fr\"").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Locale::KO.to_string(), "ko");
    }
}
