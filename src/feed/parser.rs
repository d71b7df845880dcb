use std::borrow::Cow;

use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// The feed body could not be turned into a [`FeedDocument`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecodeError(String);

/// Channel metadata and items of one RSS document.
///
/// Fields the feed leaves out are empty strings; interpreting them (trimming,
/// "empty means absent") is left to ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Raw `<pubDate>` text, normalized later by [`crate::feed::parse_published`]
    pub pub_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    /// Leaf elements read from `<channel>` (`in_item == false`) or `<item>`.
    ///
    /// Matching is on the qualified name, so `<atom:link>` never lands in `link`.
    fn from_name(name: &[u8], in_item: bool) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"pubDate" if in_item => Some(Field::PubDate),
            _ => None,
        }
    }

    /// Title and description are commonly HTML-escaped on top of XML escaping.
    fn is_markup(self) -> bool {
        matches!(self, Field::Title | Field::Description)
    }
}

// Element depths, counting the document root as 0
const CHANNEL_DEPTH: usize = 1;
const CHANNEL_CHILD_DEPTH: usize = 2;
const ITEM_CHILD_DEPTH: usize = 3;

/// Decodes an RSS 2.0 body.
///
/// Reads `rss > channel` metadata plus every `channel > item`. Text is
/// XML-unescaped (an unknown entity keeps the raw text); CDATA is taken as is.
/// Titles and descriptions then have HTML entities reversed, which undoes the
/// double encoding many feeds ship.
///
/// # Errors
///
/// Returns [`DecodeError`] when the markup is malformed or truncated, or when
/// the document has no `<channel>` under its root element.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedDocument, DecodeError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut document: Option<FeedDocument> = None;
    let mut in_channel = false;
    let mut item: Option<FeedItem> = None;
    // Field being read and the depth of its element
    let mut capture: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                let depth = open.len();

                if capture.is_none() {
                    match (name.as_slice(), depth) {
                        (b"channel", CHANNEL_DEPTH) if document.is_none() => {
                            document = Some(FeedDocument::default());
                            in_channel = true;
                        }
                        (b"item", CHANNEL_CHILD_DEPTH) if in_channel => {
                            item = Some(FeedItem::default());
                        }
                        (_, CHANNEL_CHILD_DEPTH) if in_channel && item.is_none() => {
                            capture = Field::from_name(&name, false).map(|f| (f, depth));
                        }
                        (_, ITEM_CHILD_DEPTH) if item.is_some() => {
                            capture = Field::from_name(&name, true).map(|f| (f, depth));
                        }
                        _ => {}
                    }
                    text.clear();
                }
                open.push(name);
            }
            Ok(Event::Empty(e)) => {
                if in_channel
                    && item.is_none()
                    && open.len() == CHANNEL_CHILD_DEPTH
                    && e.name().as_ref() == b"item"
                {
                    if let Some(doc) = document.as_mut() {
                        doc.items.push(FeedItem::default());
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if capture.is_some() {
                    let raw = reader
                        .decoder()
                        .decode(&t)
                        .map_err(|e| DecodeError(e.to_string()))?;
                    match unescape(&raw) {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(_) => text.push_str(&raw),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if capture.is_some() {
                    let raw = reader
                        .decoder()
                        .decode(&c)
                        .map_err(|e| DecodeError(e.to_string()))?;
                    text.push_str(&raw);
                }
            }
            Ok(Event::End(_)) => {
                let name = open.pop().unwrap_or_default();
                let depth = open.len();

                match capture {
                    Some((field, at)) if at == depth => {
                        capture = None;
                        let value = finish_text(field, std::mem::take(&mut text));
                        match item.as_mut() {
                            Some(current) => assign_item(current, field, value),
                            None => {
                                if let Some(doc) = document.as_mut() {
                                    assign_channel(doc, field, value);
                                }
                            }
                        }
                    }
                    Some(_) => {}
                    None => match (name.as_slice(), depth) {
                        (b"item", CHANNEL_CHILD_DEPTH) if in_channel => {
                            if let (Some(done), Some(doc)) = (item.take(), document.as_mut()) {
                                doc.items.push(done);
                            }
                        }
                        (b"channel", CHANNEL_DEPTH) => in_channel = false,
                        _ => {}
                    },
                }
            }
            Ok(Event::Eof) => {
                if !open.is_empty() {
                    return Err(DecodeError(format!(
                        "unexpected end of document inside <{}>",
                        String::from_utf8_lossy(open.last().map(Vec::as_slice).unwrap_or_default())
                    )));
                }
                break;
            }
            Err(e) => {
                return Err(DecodeError(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    document.ok_or_else(|| DecodeError("document has no <channel> element".to_string()))
}

fn finish_text(field: Field, value: String) -> String {
    if field.is_markup() {
        match html_escape::decode_html_entities(&value) {
            Cow::Borrowed(_) => value,
            Cow::Owned(decoded) => decoded,
        }
    } else {
        value
    }
}

fn assign_channel(doc: &mut FeedDocument, field: Field, value: String) {
    match field {
        Field::Title => doc.title = value,
        Field::Link => doc.link = value,
        Field::Description => doc.description = value,
        Field::PubDate => {}
    }
}

fn assign_item(item: &mut FeedItem, field: Field, value: String) {
    match field {
        Field::Title => item.title = value,
        Field::Link => item.link = value,
        Field::Description => item.description = value,
        Field::PubDate => item.pub_date = value,
    }
}
