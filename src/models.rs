use serde::Serialize;

/// One audiobook listing scraped from a search/browse results page.
///
/// `detail_link` is the stable key downstream: the Torznab `<guid>` and the
/// magnet-resolution step both use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub title: String,
    /// Present only when the hyphen-split author policy is enabled and the
    /// title contained a separator.
    pub author: Option<String>,
    /// Absolute URL of the listing's detail page.
    pub detail_link: String,
    /// Human-readable size as shown on the site, e.g. "1.2 GB", or "Unknown".
    pub size_label: String,
    /// Byte estimate derived from `size_label` (binary multiples); 0 when
    /// the size is unknown or unparseable.
    pub size_bytes: u64,
}
