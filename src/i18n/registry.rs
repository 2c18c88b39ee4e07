//! Locale registry: single source of truth for the site's supported locales.
//!
//! The registry is a lazily-initialised singleton (`OnceLock`) and is
//! immutable after first access.

use std::sync::OnceLock;

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// Language tag used in `hreflang` and translation lookups (e.g. "en", "ko")
    pub code: &'static str,

    /// English name of the language
    pub name: &'static str,

    /// Native name of the language (e.g. "한국어")
    pub native_name: &'static str,

    /// URL prefix for pages in this locale. Empty for the default locale.
    pub url_prefix: &'static str,

    /// Whether this is the default locale (served without a prefix)
    pub is_default: bool,

    /// Whether this locale is served
    pub enabled: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Get a locale configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|locale| locale.code == code)
    }

    /// Get the locale whose URL prefix is exactly `prefix`.
    pub fn get_by_prefix(&self, prefix: &str) -> Option<&LocaleConfig> {
        self.locales
            .iter()
            .find(|locale| locale.enabled && !locale.is_default && locale.url_prefix == prefix)
    }

    /// All enabled locales, default first.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|locale| locale.enabled).collect()
    }

    /// The default locale configuration.
    ///
    /// # Panics
    /// Panics if the registry does not define exactly one default locale
    /// (a programming error in `default_locales`).
    pub fn default_locale(&self) -> &LocaleConfig {
        let defaults: Vec<_> = self
            .locales
            .iter()
            .filter(|locale| locale.is_default)
            .collect();

        match defaults.len() {
            0 => panic!("No default locale found in registry"),
            1 => defaults[0],
            _ => panic!("Multiple default locales found in registry"),
        }
    }
}

/// English is served at the root, Korean under `/ko`.
fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            code: "en",
            name: "English",
            native_name: "English",
            url_prefix: "",
            is_default: true,
            enabled: true,
        },
        LocaleConfig {
            code: "ko",
            name: "Korean",
            native_name: "한국어",
            url_prefix: "/ko",
            is_default: false,
            enabled: true,
        },
    ]
}
