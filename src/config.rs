use anyhow::Context;
use serde::Deserialize;

/// Application configuration, loaded from environment variables / .env.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address for the HTTP server.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origin of the upstream listing site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional Cookie header value sent with every upstream request.
    /// AudiobookBay's edge defence sometimes requires a session cookie
    /// captured from a browser.
    #[serde(default)]
    pub abb_cookie: Option<String>,

    /// User-Agent sent with every upstream request. The site returns a
    /// challenge page for non-browser agents, so this defaults to a real
    /// desktop Chrome string.
    #[serde(default = "default_user_agent")]
    pub abb_user_agent: String,

    /// Author extraction policy. When true, titles of the form
    /// "Author - Title" are split at the first hyphen; when false (default)
    /// the title is passed through untouched and no author is reported.
    /// The split heuristic corrupts titles whose hyphen is not an author
    /// separator (e.g. "Part 1 - Chapter 2").
    #[serde(default)]
    pub split_author: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_base_url() -> String {
    "http://audiobookbay.lu".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env if present (ignore errors — it may not exist)
        let _ = dotenvy::dotenv();

        envy::from_env::<AppConfig>().context("Failed to load config from environment")
    }
}
