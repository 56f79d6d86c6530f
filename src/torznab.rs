//! Torznab XML generation: capabilities, RSS results, error documents.
//!
//! Built with the quick-xml event writer. Output is deterministic except for
//! the per-item pubDate.

use std::io::Cursor;

use chrono::Utc;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::models::Listing;

const TORZNAB_NS: &str = "http://torznab.com/schemas/2015/feed";

const INDEXER_TITLE: &str = "AudiobookBay Indexer";

/// Torznab category ids advertised and stamped on every item.
const CAT_AUDIO: &str = "3000";
const CAT_AUDIOBOOK: &str = "3030";

/// Static tracker-policy hints; the site publishes none, so we advertise
/// conservative private-tracker defaults.
const MINIMUM_RATIO: &str = "1";
const MINIMUM_SEED_TIME: &str = "259200"; // 3 days, in seconds

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn new_writer() -> XmlWriter {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .ok();
    writer
}

fn finish(writer: XmlWriter) -> String {
    String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default()
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) {
    writer.write_event(Event::Start(BytesStart::new(name))).ok();
    writer.write_event(Event::Text(BytesText::new(text))).ok();
    writer.write_event(Event::End(BytesEnd::new(name))).ok();
}

fn write_torznab_attr(writer: &mut XmlWriter, name: &str, value: &str) {
    let mut attr = BytesStart::new("torznab:attr");
    attr.push_attribute(("name", name));
    attr.push_attribute(("value", value));
    writer.write_event(Event::Empty(attr)).ok();
}

// ── Capabilities ─────────────────────────────────────────────────────────────

/// Build the static capabilities document. Pure: same output every call.
pub fn build_caps() -> String {
    let mut writer = new_writer();

    writer.write_event(Event::Start(BytesStart::new("caps"))).ok();

    let mut server = BytesStart::new("server");
    server.push_attribute(("version", "1.0"));
    server.push_attribute(("title", INDEXER_TITLE));
    writer.write_event(Event::Empty(server)).ok();

    writer
        .write_event(Event::Start(BytesStart::new("searching")))
        .ok();

    let mut search = BytesStart::new("search");
    search.push_attribute(("available", "yes"));
    search.push_attribute(("supportedParams", "q"));
    writer.write_event(Event::Empty(search)).ok();

    let mut book_search = BytesStart::new("book-search");
    book_search.push_attribute(("available", "yes"));
    book_search.push_attribute(("supportedParams", "q,author,title"));
    writer.write_event(Event::Empty(book_search)).ok();

    writer
        .write_event(Event::End(BytesEnd::new("searching")))
        .ok();

    writer
        .write_event(Event::Start(BytesStart::new("categories")))
        .ok();

    let mut category = BytesStart::new("category");
    category.push_attribute(("id", CAT_AUDIO));
    category.push_attribute(("name", "Audio"));
    writer.write_event(Event::Start(category)).ok();

    let mut subcat = BytesStart::new("subcat");
    subcat.push_attribute(("id", CAT_AUDIOBOOK));
    subcat.push_attribute(("name", "Audio/Audiobook"));
    writer.write_event(Event::Empty(subcat)).ok();

    writer
        .write_event(Event::End(BytesEnd::new("category")))
        .ok();
    writer
        .write_event(Event::End(BytesEnd::new("categories")))
        .ok();

    writer.write_event(Event::End(BytesEnd::new("caps"))).ok();

    finish(writer)
}

// ── Search results ───────────────────────────────────────────────────────────

/// Build the RSS results feed.
///
/// `host_url` is this service's own origin; each item's `<link>` points at
/// the local magnet-redirect endpoint, while `<guid>` and `<comments>` keep
/// the original detail link so clients have a stable key.
pub fn build_rss(listings: &[Listing], host_url: &str, offset: usize) -> String {
    let mut writer = new_writer();

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:torznab", TORZNAB_NS));
    writer.write_event(Event::Start(rss)).ok();

    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .ok();

    write_text_element(&mut writer, "title", INDEXER_TITLE);
    write_text_element(&mut writer, "description", "AudiobookBay search results");
    write_text_element(&mut writer, "link", host_url);
    write_text_element(&mut writer, "language", "en-us");

    // Paging window. The total is a deliberate over-estimate (+1000 while
    // results keep coming) because the site exposes no real count; an honest
    // number would make clients stop paging after the first window.
    let total = offset + listings.len() + if listings.is_empty() { 0 } else { 1000 };
    let mut response = BytesStart::new("torznab:response");
    response.push_attribute(("offset", offset.to_string().as_str()));
    response.push_attribute(("total", total.to_string().as_str()));
    writer.write_event(Event::Empty(response)).ok();

    for listing in listings {
        write_item(&mut writer, listing, host_url);
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .ok();
    writer.write_event(Event::End(BytesEnd::new("rss"))).ok();

    finish(writer)
}

/// The local endpoint a Torznab client "grabs" to be redirected to the
/// magnet URI.
pub fn download_link(host_url: &str, detail_link: &str) -> String {
    format!(
        "{host_url}/api/download?url={}",
        urlencoding::encode(detail_link)
    )
}

fn write_item(writer: &mut XmlWriter, listing: &Listing, host_url: &str) {
    writer.write_event(Event::Start(BytesStart::new("item"))).ok();

    write_text_element(writer, "title", &listing.title);
    write_text_element(writer, "description", "");
    write_text_element(writer, "guid", &listing.detail_link);
    write_text_element(writer, "comments", &listing.detail_link);

    let pub_date = Utc::now().format("%a, %d %b %Y %H:%M:%S +0000").to_string();
    write_text_element(writer, "pubDate", &pub_date);

    write_text_element(writer, "size", &listing.size_bytes.to_string());
    write_text_element(writer, "category", CAT_AUDIO);
    write_text_element(writer, "category", CAT_AUDIOBOOK);

    let link = download_link(host_url, &listing.detail_link);
    write_text_element(writer, "link", &link);

    let mut enclosure = BytesStart::new("enclosure");
    enclosure.push_attribute(("url", link.as_str()));
    enclosure.push_attribute(("length", listing.size_bytes.to_string().as_str()));
    enclosure.push_attribute(("type", "application/x-bittorrent"));
    writer.write_event(Event::Empty(enclosure)).ok();

    write_torznab_attr(writer, "category", CAT_AUDIO);
    write_torznab_attr(writer, "category", CAT_AUDIOBOOK);

    if let Some(author) = listing.author.as_deref() {
        write_torznab_attr(writer, "author", author);
    }
    write_torznab_attr(writer, "booktitle", &listing.title);

    // The site publishes no swarm statistics; report fixed values so strict
    // clients don't reject the item.
    write_torznab_attr(writer, "seeders", "0");
    write_torznab_attr(writer, "peers", "0");
    write_torznab_attr(writer, "files", "1");
    write_torznab_attr(writer, "grabs", "0");

    write_torznab_attr(writer, "minimumratio", MINIMUM_RATIO);
    write_torznab_attr(writer, "minimumseedtime", MINIMUM_SEED_TIME);
    write_torznab_attr(writer, "downloadvolumefactor", "1");
    write_torznab_attr(writer, "uploadvolumefactor", "1");

    writer.write_event(Event::End(BytesEnd::new("item"))).ok();
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Torznab error document, e.g. code 201 "Incorrect parameter".
pub fn error_xml(code: u32, description: &str) -> String {
    let mut writer = new_writer();

    let mut error = BytesStart::new("error");
    error.push_attribute(("code", code.to_string().as_str()));
    error.push_attribute(("description", description));
    writer.write_event(Event::Empty(error)).ok();

    finish(writer)
}

// ── Tests ────────────────────────────────────────────────────────────────────
