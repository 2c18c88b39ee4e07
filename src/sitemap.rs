//! SEO documents: sitemaps with alternate-locale links, hreflang tags,
//! robots.txt and a per-locale RSS feed of the site's pages.

use crate::i18n::{localized_path, strip_locale_prefix, translate, Locale};
use chrono::{DateTime, SecondsFormat, Utc};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use serde::Serialize;

/// Canonical, locale-neutral page paths. `""` is the home page.
pub const PAGES: &[&str] = &[
    "",
    "/about",
    "/services",
    "/website",
    "/pricing",
    "/contact",
    "/privacy",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Daily,
    Weekly,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternateLink {
    pub hreflang: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    pub locale: Locale,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
    pub alternates: Vec<AlternateLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HrefLangLinks {
    pub alternates: Vec<AlternateLink>,
    pub canonical: String,
}

fn is_home(page: &str) -> bool {
    page.is_empty() || page == "/"
}

/// Absolute URL of `page` in `locale`. The default-locale home page is the
/// bare origin.
pub fn absolute_url(base_url: &str, locale: Locale, page: &str) -> String {
    let path = localized_path(locale, page);
    if path == "/" {
        base_url.to_string()
    } else {
        format!("{}{}", base_url, path)
    }
}

pub fn priority_for(page: &str) -> f32 {
    if is_home(page) {
        1.0
    } else if page.contains("website") {
        0.95
    } else if page.contains("pricing") {
        0.9
    } else {
        0.8
    }
}

pub fn change_frequency_for(page: &str) -> ChangeFrequency {
    if is_home(page) {
        ChangeFrequency::Daily
    } else {
        ChangeFrequency::Weekly
    }
}

/// `x-default` (the default locale's URL) followed by one link per locale.
fn alternates_for(base_url: &str, page: &str) -> Vec<AlternateLink> {
    let mut links = vec![AlternateLink {
        hreflang: "x-default".to_string(),
        href: absolute_url(base_url, Locale::default_locale(), page),
    }];
    links.extend(Locale::all().into_iter().map(|locale| AlternateLink {
        hreflang: locale.code().to_string(),
        href: absolute_url(base_url, locale, page),
    }));
    links
}

/// One entry per page and locale, page-major.
pub fn build_sitemap(base_url: &str, pages: &[&str], now: DateTime<Utc>) -> Vec<SitemapEntry> {
    pages
        .iter()
        .flat_map(|page| {
            Locale::all().into_iter().map(move |locale| SitemapEntry {
                url: absolute_url(base_url, locale, page),
                locale,
                last_modified: now,
                change_frequency: change_frequency_for(page),
                priority: priority_for(page),
                alternates: alternates_for(base_url, page),
            })
        })
        .collect()
}

pub fn sitemap_for_locale(entries: &[SitemapEntry], locale: Locale) -> Vec<SitemapEntry> {
    entries
        .iter()
        .filter(|entry| entry.locale == locale)
        .cloned()
        .collect()
}

pub fn xml_escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

fn format_priority(priority: f32) -> String {
    if priority.fract() == 0.0 {
        format!("{:.1}", priority)
    } else {
        priority.to_string()
    }
}

pub fn render_sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n",
    );

    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(&entry.url)));
        for link in &entry.alternates {
            xml.push_str(&format!(
                "    <xhtml:link rel=\"alternate\" hreflang=\"{}\" href=\"{}\"/>\n",
                xml_escape(&link.hreflang),
                xml_escape(&link.href)
            ));
        }
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            entry.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            entry.change_frequency.as_str()
        ));
        xml.push_str(&format!(
            "    <priority>{}</priority>\n",
            format_priority(entry.priority)
        ));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Alternate-language links for the page at `pathname`, plus the canonical
/// URL in `locale`.
pub fn build_hreflang_links(base_url: &str, locale: Locale, pathname: &str) -> HrefLangLinks {
    let neutral = strip_locale_prefix(pathname);
    HrefLangLinks {
        alternates: alternates_for(base_url, &neutral),
        canonical: absolute_url(base_url, locale, &neutral),
    }
}

impl HrefLangLinks {
    /// `<link>` tags for a page head.
    pub fn to_html(&self) -> String {
        let mut html: Vec<String> = self
            .alternates
            .iter()
            .map(|link| {
                format!(
                    "<link rel=\"alternate\" hreflang=\"{}\" href=\"{}\" />",
                    xml_escape(&link.hreflang),
                    xml_escape(&link.href)
                )
            })
            .collect();
        html.push(format!(
            "<link rel=\"canonical\" href=\"{}\" />",
            xml_escape(&self.canonical)
        ));
        html.join("\n")
    }
}

pub fn robots_txt(base_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {base}/sitemap.xml\nSitemap: {base}/sitemap-ko.xml\n",
        base = base_url
    )
}

/// Translation slug for a page (`""` → `home`, `/pricing` → `pricing`).
pub fn page_slug(page: &str) -> String {
    let trimmed = page.trim_matches('/');
    if trimmed.is_empty() {
        "home".to_string()
    } else {
        trimmed.replace('/', "-")
    }
}

/// RSS 2.0 channel listing the site's pages in `locale`.
pub fn build_feed(base_url: &str, locale: Locale, now: DateTime<Utc>) -> Channel {
    let strings = translate(locale);
    let pub_date = now.to_rfc2822();

    let items: Vec<Item> = PAGES
        .iter()
        .map(|page| {
            let slug = page_slug(page);
            let link = absolute_url(base_url, locale, page);
            ItemBuilder::default()
                .title(Some(strings.t(&format!("seo.pages.{}.title", slug))))
                .description(Some(strings.t(&format!("seo.pages.{}.description", slug))))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().value(link).permalink(true).build()))
                .pub_date(Some(pub_date.clone()))
                .build()
        })
        .collect();

    ChannelBuilder::default()
        .title(strings.t("meta.siteName"))
        .link(absolute_url(base_url, locale, ""))
        .description(strings.t("hero.subtitle"))
        .language(Some(locale.code().to_string()))
        .last_build_date(Some(pub_date))
        .items(items)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://agency.test";

    // ==================== URLs ====================

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url(BASE, Locale::EN, ""), "https://agency.test");
        assert_eq!(absolute_url(BASE, Locale::KO, ""), "https://agency.test/ko");
        assert_eq!(
            absolute_url(BASE, Locale::EN, "/pricing"),
            "https://agency.test/pricing"
        );
        assert_eq!(
            absolute_url(BASE, Locale::KO, "/pricing"),
            "https://agency.test/ko/pricing"
        );
    }

    #[test]
    fn test_priority_rules() {
        assert_eq!(priority_for(""), 1.0);
        assert_eq!(priority_for("/website"), 0.95);
        assert_eq!(priority_for("/website-pricing"), 0.95);
        assert_eq!(priority_for("/pricing"), 0.9);
        assert_eq!(priority_for("/about"), 0.8);
    }

    #[test]
    fn test_change_frequency_rules() {
        assert_eq!(change_frequency_for(""), ChangeFrequency::Daily);
        assert_eq!(change_frequency_for("/contact"), ChangeFrequency::Weekly);
    }

    // ==================== build_sitemap ====================

    #[test]
    fn test_sitemap_has_two_entries_per_page() {
        let entries = build_sitemap(BASE, PAGES, Utc::now());
        assert_eq!(entries.len(), 2 * PAGES.len());
        assert!(entries.iter().all(|e| e.alternates.len() == 3));
    }

    #[test]
    fn test_sitemap_alternates_point_at_siblings() {
        let entries = build_sitemap(BASE, &["/pricing"], Utc::now());
        let en = &entries[0];
        let ko = &entries[1];

        assert_eq!(en.url, "https://agency.test/pricing");
        assert_eq!(ko.url, "https://agency.test/ko/pricing");
        assert_eq!(en.alternates, ko.alternates);

        let langs: Vec<_> = en.alternates.iter().map(|l| l.hreflang.as_str()).collect();
        assert_eq!(langs, vec!["x-default", "en", "ko"]);
        assert_eq!(en.alternates[0].href, en.url);
        assert_eq!(en.alternates[2].href, ko.url);
    }

    #[test]
    fn test_sitemap_deterministic_for_fixed_time() {
        let now = Utc::now();
        assert_eq!(build_sitemap(BASE, PAGES, now), build_sitemap(BASE, PAGES, now));
    }

    #[test]
    fn test_sitemap_for_locale() {
        let entries = build_sitemap(BASE, PAGES, Utc::now());
        let ko = sitemap_for_locale(&entries, Locale::KO);
        assert_eq!(ko.len(), PAGES.len());
        assert!(ko.iter().all(|e| e.url.starts_with("https://agency.test/ko")));
    }

    // ==================== XML ====================

    #[test]
    fn test_render_sitemap_xml() {
        let now = "2026-05-01T09:30:00Z".parse().unwrap();
        let xml = render_sitemap_xml(&build_sitemap(BASE, &["", "/website"], now));

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(xml.matches("<url>").count(), 4);
        assert!(xml.contains("<loc>https://agency.test/ko</loc>"));
        assert!(xml.contains(
            "<xhtml:link rel=\"alternate\" hreflang=\"x-default\" href=\"https://agency.test/website\"/>"
        ));
        assert!(xml.contains("<lastmod>2026-05-01T09:30:00Z</lastmod>"));
        assert!(xml.contains("<changefreq>daily</changefreq>"));
        assert!(xml.contains("<priority>1.0</priority>"));
        assert!(xml.contains("<priority>0.95</priority>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }

    // ==================== hreflang ====================

    #[test]
    fn test_hreflang_links_korean_page() {
        let links = build_hreflang_links(BASE, Locale::KO, "/ko/services");
        assert_eq!(links.alternates.len(), 3);
        assert_eq!(links.alternates[0].href, "https://agency.test/services");
        assert_eq!(links.alternates[2].href, "https://agency.test/ko/services");
        assert_eq!(links.canonical, "https://agency.test/ko/services");
    }

    #[test]
    fn test_hreflang_links_same_for_both_locales() {
        let en = build_hreflang_links(BASE, Locale::EN, "/pricing");
        let ko = build_hreflang_links(BASE, Locale::KO, "/ko/pricing");
        assert_eq!(en.alternates, ko.alternates);
        assert_eq!(en.canonical, "https://agency.test/pricing");
    }

    #[test]
    fn test_hreflang_home() {
        let links = build_hreflang_links(BASE, Locale::KO, "/ko");
        assert_eq!(links.canonical, "https://agency.test/ko");
        assert_eq!(links.alternates[1].href, "https://agency.test");
    }

    #[test]
    fn test_hreflang_to_html() {
        let html = build_hreflang_links(BASE, Locale::EN, "/").to_html();
        assert_eq!(html.matches("rel=\"alternate\"").count(), 3);
        assert!(html.ends_with("<link rel=\"canonical\" href=\"https://agency.test\" />"));
    }

    // ==================== robots / feed ====================

    #[test]
    fn test_robots_txt() {
        let robots = robots_txt(BASE);
        assert!(robots.contains("Disallow: /api/"));
        assert!(robots.contains("Sitemap: https://agency.test/sitemap.xml"));
        assert!(robots.contains("Sitemap: https://agency.test/sitemap-ko.xml"));
    }

    #[test]
    fn test_page_slug() {
        assert_eq!(page_slug(""), "home");
        assert_eq!(page_slug("/pricing"), "pricing");
        assert_eq!(page_slug("/a/b/"), "a-b");
    }

    #[test]
    fn test_every_page_has_seo_strings() {
        for locale in Locale::all() {
            for page in PAGES {
                let key = format!("seo.pages.{}.title", page_slug(page));
                assert!(translate(locale).get(&key).is_some(), "{} missing {}", locale, key);
            }
        }
    }

    #[test]
    fn test_feed_round_trips_through_rss_parser() {
        let xml = build_feed(BASE, Locale::KO, Utc::now()).to_string();
        let channel = Channel::read_from(xml.as_bytes()).expect("feed should parse");

        assert_eq!(channel.title(), "브라이트라인 디지털");
        assert_eq!(channel.link(), "https://agency.test/ko");
        assert_eq!(channel.language(), Some("ko"));
        assert_eq!(channel.items().len(), PAGES.len());
        assert_eq!(channel.items()[4].link(), Some("https://agency.test/ko/pricing"));
        assert_eq!(channel.items()[4].title(), Some("요금제 | 브라이트라인 디지털"));
    }
}
