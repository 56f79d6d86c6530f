//! AudiobookBay scraping: fetch, parse, paginate, resolve.
//!
//! The site serves loosely-structured WordPress HTML behind an edge defence
//! that rejects non-browser agents. All upstream access goes through one
//! configured reqwest client; failures degrade to empty results at the
//! pipeline boundary so the Torznab surface always returns well-formed XML.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, header};
use scraper::{Html, Selector};
use thiserror::Error;

use crate::{config::AppConfig, models::Listing};

/// Records per listing page on the upstream site.
pub const PAGE_SIZE: usize = 9;

/// Hard cap on pages fetched per search, whatever `limit` the client asks
/// for. Keeps load on the upstream site bounded.
pub const MAX_PAGES: u32 = 5;

const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

// ── HTTP client / retrieval ──────────────────────────────────────────────────

/// Build the upstream HTTP client once at startup.
///
/// Certificate verification is disabled on purpose: the site sits behind
/// rotating TLS fronting with mismatched certificates, and the bridge
/// explicitly accepts that trade-off rather than failing every fetch.
pub fn build_client(config: &AppConfig) -> anyhow::Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::USER_AGENT, config.abb_user_agent.parse()?);
    if let Some(cookie) = config.abb_cookie.as_deref() {
        if !cookie.is_empty() {
            headers.insert(header::COOKIE, cookie.parse()?);
        }
    }

    let client = Client::builder()
        .default_headers(headers)
        .danger_accept_invalid_certs(true)
        .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?;

    Ok(client)
}

/// Fetch one page of HTML.
///
/// Empty `form` → plain GET. Non-empty → POST with a URL-encoded body: the
/// site's edge defence answers GET-with-query-string with a redirect loop
/// but accepts the same parameters as a form POST.
pub async fn fetch_html(
    client: &Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<String, FetchError> {
    let request = if form.is_empty() {
        client.get(url)
    } else {
        client.post(url).form(form)
    };

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    Ok(response.text().await?)
}

// ── Listing parser ───────────────────────────────────────────────────────────

static RE_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Size:\s*([\d.]+\s*(?:KB|MB|GB))").unwrap());
static RE_NUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d.]+").unwrap());

/// Convert a human size label ("1.2 GB") to a byte estimate using binary
/// multiples. Unparseable input yields 0 rather than an error.
pub fn parse_size(label: &str) -> u64 {
    let upper = label.to_uppercase();
    let multiplier: u64 = if upper.contains("GB") {
        1024 * 1024 * 1024
    } else if upper.contains("MB") {
        1024 * 1024
    } else if upper.contains("KB") {
        1024
    } else {
        return 0;
    };

    let num: f64 = match RE_NUM.find(label).and_then(|m| m.as_str().parse().ok()) {
        Some(n) => n,
        None => return 0,
    };

    (num * multiplier as f64) as u64
}

/// Parse one search/browse results page into listings.
///
/// Total: malformed or empty HTML yields an empty vec. Each listing lives in
/// a `div.post` block whose title link sits at `div.postTitle h2 a`; blocks
/// without a title link are skipped.
pub fn parse_listings(html: &str, base_url: &str, split_author: bool) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let post_sel = Selector::parse("div.post").unwrap();
    let title_sel = Selector::parse("div.postTitle h2 a").unwrap();

    let mut listings = Vec::new();

    for post in document.select(&post_sel) {
        let Some(title_link) = post.select(&title_sel).next() else {
            continue;
        };

        let mut title = title_link.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let href = title_link.value().attr("href").unwrap_or_default();
        let detail_link = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{base_url}{href}")
        };

        // Size sits somewhere in the block's free text, e.g.
        // "Format: mp3 | Size: 1.2 GB".
        let text = post.text().collect::<Vec<_>>().join(" ");
        let (size_label, size_bytes) = match RE_SIZE.captures(&text) {
            Some(caps) => {
                let label = caps[1].trim().to_string();
                let bytes = parse_size(&label);
                (label, bytes)
            }
            None => ("Unknown".to_string(), 0),
        };

        let mut author = None;
        if split_author {
            if let Some((head, tail)) = title.split_once('-') {
                author = Some(head.trim().to_string());
                title = tail.trim().to_string();
            }
        }

        listings.push(Listing {
            title,
            author,
            detail_link,
            size_label,
            size_bytes,
        });
    }

    listings
}

// ── Pagination ───────────────────────────────────────────────────────────────

fn start_page(offset: usize) -> u32 {
    (offset / PAGE_SIZE) as u32 + 1
}

fn page_budget(limit: usize) -> u32 {
    (limit.div_ceil(PAGE_SIZE) as u32).clamp(1, MAX_PAGES)
}

/// Map a global (offset, limit) window onto the site's 9-per-page model.
///
/// Pages are fetched strictly one at a time — a deliberate throttle against
/// the upstream site — and fetching stops the moment a page comes back short
/// (last page reached). The concatenated records are then sliced to the
/// requested window.
async fn collect_window<F, Fut>(offset: usize, limit: usize, mut fetch_page: F) -> Vec<Listing>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Vec<Listing>>,
{
    let first = start_page(offset);
    let mut all = Vec::new();

    for page in first..first + page_budget(limit) {
        let records = fetch_page(page).await;
        let last_page = records.len() < PAGE_SIZE;
        all.extend(records);
        if last_page {
            break;
        }
    }

    all.into_iter()
        .skip(offset % PAGE_SIZE)
        .take(limit)
        .collect()
}

pub struct SearchOptions<'a> {
    pub query: &'a str,
    pub offset: usize,
    pub limit: usize,
    pub client: &'a Client,
    pub config: &'a AppConfig,
}

/// Run a windowed search against the upstream site.
///
/// Total: a failed fetch degrades to an empty page (logged), never an
/// overall error — indexer clients expect well-formed XML even when the
/// upstream is down. An empty query browses the site's front listing
/// instead of searching.
pub async fn search(opts: SearchOptions<'_>) -> Vec<Listing> {
    let query = opts.query.trim();
    let client = opts.client;
    let base_url = opts.config.base_url.as_str();
    let split_author = opts.config.split_author;

    collect_window(opts.offset, opts.limit, |page| {
        let url = format!("{base_url}/page/{page}");
        let form: Vec<(&str, &str)> = if query.is_empty() {
            Vec::new()
        } else {
            vec![("s", query)]
        };
        async move {
            match fetch_html(client, &url, &form).await {
                Ok(html) => parse_listings(&html, base_url, split_author),
                Err(e) => {
                    tracing::warn!("Fetching {url} failed ({e}), treating page as empty");
                    Vec::new()
                }
            }
        }
    })
    .await
}

// ── Magnet resolution ────────────────────────────────────────────────────────

/// Extract a magnet URI from a detail page.
///
/// The info-hash table row takes precedence; an embedded magnet anchor is
/// the fallback for layouts that omit the metadata table.
pub fn extract_magnet(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let td_sel = Selector::parse("td").unwrap();
    let cells: Vec<_> = document.select(&td_sel).collect();
    for (i, cell) in cells.iter().enumerate() {
        if !cell.text().collect::<String>().contains("Info Hash:") {
            continue;
        }
        if let Some(next) = cells.get(i + 1) {
            let hash = next.text().collect::<String>().trim().to_string();
            if !hash.is_empty() {
                return Some(format!("magnet:?xt=urn:btih:{hash}"));
            }
        }
    }

    let magnet_sel = Selector::parse(r#"a[href^="magnet:"]"#).unwrap();
    document
        .select(&magnet_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// Fetch a detail page and resolve it to a magnet URI. Fetch failure or a
/// page with neither strategy's markup resolves to `None`.
pub async fn resolve_magnet(client: &Client, detail_url: &str) -> Option<String> {
    let html = match fetch_html(client, detail_url, &[]).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Fetching detail page {detail_url} failed: {e}");
            return None;
        }
    };

    extract_magnet(&html)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(n: usize) -> Listing {
        Listing {
            title: format!("Book {n}"),
            author: None,
            detail_link: format!("http://example.com/abss/book-{n}/"),
            size_label: "1 GB".to_string(),
            size_bytes: 1_073_741_824,
        }
    }

    fn page_of(n: usize) -> Vec<Listing> {
        (0..n).map(listing).collect()
    }

    #[test]
    fn size_conversion_uses_binary_multiples() {
        assert_eq!(parse_size("1 GB"), 1_073_741_824);
        assert_eq!(parse_size("512 MB"), 536_870_912);
        assert_eq!(parse_size("2 KB"), 2048);
        assert_eq!(parse_size("1.5 KB"), 1536);
    }

    #[test]
    fn size_conversion_tolerates_garbage() {
        assert_eq!(parse_size("Unknown"), 0);
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size(". GB"), 0);
    }

    const SAMPLE_PAGE: &str = r#"
        <html><body>
          <div class="post">
            <div class="postTitle"><h2><a href="/abss/some-book/">Jane Doe - Some Book</a></h2></div>
            <div class="postContent">Format: mp3 | Size: 1.2 GB</div>
          </div>
          <div class="post">
            <div class="postTitle"><h2><a href="http://audiobookbay.lu/abss/other-book/">Other Book</a></h2></div>
            <div class="postContent">no size here</div>
          </div>
          <div class="post"><div class="postContent">advert block, no title link</div></div>
        </body></html>
    "#;

    #[test]
    fn parses_listings_and_absolutizes_links() {
        let listings = parse_listings(SAMPLE_PAGE, "http://audiobookbay.lu", false);
        assert_eq!(listings.len(), 2);

        assert_eq!(listings[0].title, "Jane Doe - Some Book");
        assert_eq!(listings[0].author, None);
        assert_eq!(
            listings[0].detail_link,
            "http://audiobookbay.lu/abss/some-book/"
        );
        assert_eq!(listings[0].size_label, "1.2 GB");
        assert_eq!(listings[0].size_bytes, (1.2 * 1024.0 * 1024.0 * 1024.0) as u64);

        assert_eq!(listings[1].size_label, "Unknown");
        assert_eq!(listings[1].size_bytes, 0);
        assert_eq!(
            listings[1].detail_link,
            "http://audiobookbay.lu/abss/other-book/"
        );
    }

    #[test]
    fn hyphen_split_policy_extracts_author() {
        let listings = parse_listings(SAMPLE_PAGE, "http://audiobookbay.lu", true);
        assert_eq!(listings[0].author.as_deref(), Some("Jane Doe"));
        assert_eq!(listings[0].title, "Some Book");
        // No hyphen → no author, title untouched
        assert_eq!(listings[1].author, None);
        assert_eq!(listings[1].title, "Other Book");
    }

    #[test]
    fn empty_html_parses_to_nothing() {
        assert!(parse_listings("", "http://audiobookbay.lu", false).is_empty());
        assert!(parse_listings("<html<<garbage", "http://audiobookbay.lu", false).is_empty());
    }

    #[tokio::test]
    async fn window_maps_offset_to_page_and_slice() {
        // offset=10, limit=5 → start at page 2 (10/9+1), fetch one page,
        // drop 10 mod 9 = 1 record, return exactly 5.
        let mut fetched = Vec::new();
        let result = collect_window(10, 5, |page| {
            fetched.push(page);
            std::future::ready(page_of(PAGE_SIZE))
        })
        .await;

        assert_eq!(fetched, vec![2]);
        assert_eq!(result.len(), 5);
        assert_eq!(result[0], listing(1));
    }

    #[tokio::test]
    async fn short_page_stops_fetching_early() {
        let mut fetched = Vec::new();
        let result = collect_window(0, 40, |page| {
            fetched.push(page);
            let len = if page < 3 { PAGE_SIZE } else { 4 };
            std::future::ready(page_of(len))
        })
        .await;

        // Budget would allow 5 pages, but page 3 comes back short.
        assert_eq!(fetched, vec![1, 2, 3]);
        assert_eq!(result.len(), 22);
    }

    #[tokio::test]
    async fn page_budget_is_capped() {
        let mut fetched = Vec::new();
        let _ = collect_window(0, 10_000, |page| {
            fetched.push(page);
            std::future::ready(page_of(PAGE_SIZE))
        })
        .await;

        assert_eq!(fetched.len(), MAX_PAGES as usize);
    }

    #[tokio::test]
    async fn tiny_limit_still_fetches_one_page() {
        let mut fetched = Vec::new();
        let result = collect_window(0, 1, |page| {
            fetched.push(page);
            std::future::ready(page_of(PAGE_SIZE))
        })
        .await;

        assert_eq!(fetched, vec![1]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn info_hash_takes_precedence_over_magnet_anchor() {
        let html = r#"
            <table>
              <tr><td>Info Hash:</td><td> deadbeefcafe1234 </td></tr>
            </table>
            <a href="magnet:?xt=urn:btih:ffffffffffff">embedded</a>
        "#;
        assert_eq!(
            extract_magnet(html).as_deref(),
            Some("magnet:?xt=urn:btih:deadbeefcafe1234")
        );
    }

    #[test]
    fn magnet_anchor_is_the_fallback() {
        let html = r#"<p><a href="magnet:?xt=urn:btih:ffffffffffff">get it</a></p>"#;
        assert_eq!(
            extract_magnet(html).as_deref(),
            Some("magnet:?xt=urn:btih:ffffffffffff")
        );
    }

    #[test]
    fn page_without_either_strategy_resolves_to_none() {
        let html = "<html><body><p>nothing useful</p></body></html>";
        assert_eq!(extract_magnet(html), None);
    }
}
