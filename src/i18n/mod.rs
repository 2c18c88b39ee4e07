//! Internationalization: locales, URL routing and translation tables.
//!
//! # Architecture
//!
//! - `registry`: single source of truth for supported locales and their URL prefixes
//! - `locale`: type-safe `Locale` validated against the registry
//! - `router`: path ⇄ locale mapping and the language toggle
//! - `tables`: nested string tables embedded from `locales/*.json`
//! - `validator`: key-set completeness checks across tables
//!
//! # Example
//!
//! ```rust,ignore
//! use agency_site::i18n::{resolve_locale, translate};
//!
//! let locale = resolve_locale("/ko/pricing");
//! let heading = translate(locale).t("pricing.heading");
//! ```

mod locale;
mod registry;
mod router;
mod tables;
mod validator;

pub use locale::Locale;
pub use registry::{LocaleConfig, LocaleRegistry};
pub use router::{localized_path, resolve_locale, strip_locale_prefix, toggle, NavigationState};
pub use tables::{translate, translate_code, TranslationTable};
pub use validator::{CompletenessReport, CompletenessValidator};
