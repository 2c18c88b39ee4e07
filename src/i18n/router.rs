//! Locale router: maps URL paths to locales and back.
//!
//! The default locale is served without a prefix (`/pricing`); every other
//! locale lives under its prefix (`/ko/pricing`).

use crate::i18n::{Locale, LocaleRegistry};
use serde::{Deserialize, Serialize};

/// Resolve the locale a path is served in.
///
/// Only the first path segment is considered, so `/ko` and `/ko/pricing`
/// are Korean while `/kosmos` is not.
pub fn resolve_locale(pathname: &str) -> Locale {
    let segment = first_segment(pathname);
    if segment.is_empty() {
        return Locale::default_locale();
    }

    LocaleRegistry::get()
        .get_by_prefix(&format!("/{}", segment))
        .map(|config| Locale::from_code_or_default(config.code))
        .unwrap_or_else(Locale::default_locale)
}

/// Remove any locale prefix, returning a locale-neutral path that always
/// starts with `/`.
pub fn strip_locale_prefix(pathname: &str) -> String {
    let locale = resolve_locale(pathname);
    // Exactly one leading slash, so the prefix slice below lines up.
    let path = format!("/{}", pathname.trim_start_matches('/'));

    if locale.is_default() {
        return path;
    }

    let rest = &path[locale.prefix().len()..];
    if rest.is_empty() {
        "/".to_string()
    } else if rest.starts_with('/') {
        rest.to_string()
    } else {
        // query or fragment directly after the prefix ("/ko?x=1")
        format!("/{}", rest)
    }
}

/// Build the path for `pathname` as served in `locale`.
pub fn localized_path(locale: Locale, pathname: &str) -> String {
    let neutral = strip_locale_prefix(pathname);
    if locale.is_default() {
        neutral
    } else if neutral == "/" {
        locale.prefix().to_string()
    } else {
        format!("{}{}", locale.prefix(), neutral)
    }
}

/// Where the browser is on a page: path, fragment and vertical scroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub pathname: String,
    /// Fragment without the leading `#`
    pub hash: Option<String>,
    pub scroll_y: u32,
}

impl NavigationState {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            hash: None,
            scroll_y: 0,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        let hash = hash.trim_start_matches('#');
        self.hash = (!hash.is_empty()).then(|| hash.to_string());
        self
    }

    pub fn with_scroll(mut self, scroll_y: u32) -> Self {
        self.scroll_y = scroll_y;
        self
    }

    pub fn locale(&self) -> Locale {
        resolve_locale(&self.pathname)
    }

    /// Link target: the path plus the fragment, if any.
    pub fn href(&self) -> String {
        match &self.hash {
            Some(hash) => format!("{}#{}", self.pathname, hash),
            None => self.pathname.clone(),
        }
    }
}

/// Switch to the other locale's version of the current page, keeping the
/// fragment and scroll offset.
pub fn toggle(current: &NavigationState) -> NavigationState {
    let target = current.locale().other();
    NavigationState {
        pathname: localized_path(target, &current.pathname),
        hash: current.hash.clone(),
        scroll_y: current.scroll_y,
    }
}

fn first_segment(pathname: &str) -> &str {
    let trimmed = pathname.trim_start_matches('/');
    let end = trimmed
        .find(|c| c == '/' || c == '?' || c == '#')
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
