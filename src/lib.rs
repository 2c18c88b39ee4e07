pub mod config;
pub mod contact;
pub mod error;
pub mod i18n;
pub mod security;
pub mod server;
pub mod sitemap;
pub mod tracking;
