//! Feed fetching and parsing (RSS 2.0 items and Atom entries).

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

const FEED_USER_AGENT: &str = "tenderflow/0.1 (public tender aggregator)";
const FEED_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Errors from a single feed. Per-feed failures are counted by the
/// ingestor, never fatal to the run.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Fetch(String),

    #[error("feed XML malformed: {0}")]
    Parse(String),
}

/// One entry from a syndication feed, before normalization.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub categories: Vec<String>,
}

/// A pull-based tender listing source.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError>;
}

/// HTTP-backed feed source.
pub struct HttpFeed {
    name: String,
    url: String,
    http: reqwest::Client,
}

impl HttpFeed {
    pub fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, FEED_USER_AGENT)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        let items = parse_feed(&body)?;
        debug!(feed = %self.name, items = items.len(), "feed fetched");
        Ok(items)
    }
}

/// Element currently being read inside an item/entry.
enum ItemField {
    Title,
    Link,
    Description,
    Published,
    Category,
}

/// Parses RSS `<item>` and Atom `<entry>` elements from feed XML.
///
/// Prefix-agnostic (matches on local names) and tolerant of unknown
/// elements. Atom links are taken from the `href` attribute.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        current = Some(FeedItem::default());
                    }
                    b"title" if current.is_some() => field = Some(ItemField::Title),
                    b"link" if current.is_some() => {
                        // Atom carries the URL in href; RSS as element text.
                        if let Some(href) = attribute_value(&e, b"href") {
                            if let Some(item) = current.as_mut() {
                                item.link.get_or_insert(href);
                            }
                        } else {
                            field = Some(ItemField::Link);
                        }
                    }
                    b"description" | b"summary" | b"content" if current.is_some() => {
                        field = Some(ItemField::Description)
                    }
                    b"pubDate" | b"published" | b"updated" if current.is_some() => {
                        field = Some(ItemField::Published)
                    }
                    b"category" if current.is_some() => {
                        if let Some(term) = attribute_value(&e, b"term") {
                            if let Some(item) = current.as_mut() {
                                item.categories.push(term);
                            }
                        } else {
                            field = Some(ItemField::Category);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let (Some(item), Some(href)) =
                        (current.as_mut(), attribute_value(&e, b"href"))
                    {
                        item.link.get_or_insert(href);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field.as_ref()) {
                    let decoded = t.decode().map_err(|e| FeedError::Parse(e.to_string()))?;
                    let text = quick_xml::escape::unescape(&decoded)
                        .map_err(|e| FeedError::Parse(e.to_string()))?
                        .into_owned();
                    apply_field(item, f, text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field.as_ref()) {
                    let bytes = t.into_inner();
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    apply_field(item, f, text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(FeedError::Parse(e.to_string())),
        }
    }

    Ok(items)
}

fn apply_field(item: &mut FeedItem, field: &ItemField, text: String) {
    match field {
        ItemField::Title => append_text(&mut item.title, text),
        ItemField::Link => append_text(&mut item.link, text),
        ItemField::Description => append_text(&mut item.description, text),
        ItemField::Published => append_text(&mut item.published, text),
        ItemField::Category => item.categories.push(text),
    }
}

fn append_text(slot: &mut Option<String>, text: String) {
    match slot {
        Some(existing) => existing.push_str(&text),
        None => *slot = Some(text),
    }
}

fn attribute_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rss_items() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Channel title is ignored</title>
    <item>
      <title>Cloud services tender</title>
      <link>https://example.org/notice/1</link>
      <description>Provision of cloud services</description>
      <pubDate>Mon, 03 Aug 2026 09:00:00 GMT</pubDate>
      <category>72000000</category>
      <category>72200000</category>
    </item>
    <item>
      <title>Second notice</title>
      <link>https://example.org/notice/2</link>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Cloud services tender"));
        assert_eq!(items[0].link.as_deref(), Some("https://example.org/notice/1"));
        assert_eq!(
            items[0].published.as_deref(),
            Some("Mon, 03 Aug 2026 09:00:00 GMT")
        );
        assert_eq!(items[0].categories, vec!["72000000", "72200000"]);
        assert!(items[1].description.is_none());
    }

    #[test]
    fn test_parse_atom_entries() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>UK Contracts</title>
  <entry>
    <title>Data platform procurement</title>
    <link href="https://example.org/atom/1"/>
    <summary>Managed data platform</summary>
    <published>2026-08-03T09:00:00Z</published>
    <category term="48000000"/>
  </entry>
</feed>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link.as_deref(), Some("https://example.org/atom/1"));
        assert_eq!(items[0].description.as_deref(), Some("Managed data platform"));
        assert_eq!(items[0].categories, vec!["48000000"]);
    }

    #[test]
    fn test_parse_cdata_description() {
        let xml = r#"<rss><channel><item>
            <title>T</title>
            <description><![CDATA[Budget: €50,000 & more]]></description>
        </item></channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        assert!(items[0]
            .description
            .as_deref()
            .unwrap()
            .contains("€50,000 & more"));
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        // Mismatched closing tag.
        let err = parse_feed("<rss><channel><item></wrong></channel></rss>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn test_elements_outside_items_are_ignored() {
        let xml = r#"<rss><channel>
            <title>Feed title</title>
            <description>Feed description</description>
        </channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        assert!(items.is_empty());
    }
}
