//! Defines the [`Post`] record and its parts ([`Image`], [`Asset`]) along
//! with publish date parsing. Posts are produced by a
//! [`crate::source::PostSource`] and are never mutated afterwards; the
//! lister and the writer only ever borrow them.

use crate::tag::Tag;
use chrono::{DateTime, NaiveDate, NaiveDateTime, ParseResult, Utc};
use gtmpl::Value;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use url::Url;

/// A single blog entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// Unique across the collection. The post's URL is `{blog_url}/{slug}`.
    pub slug: String,

    /// Drafts are never listed or rendered.
    pub draft: bool,

    /// Controls both inclusion (must be in the past) and ordering (newest
    /// first).
    pub publish_date: DateTime<Utc>,

    pub title: String,

    /// Free text description. Truncated for display by
    /// [`crate::lister::display_snippet`].
    pub snippet: String,

    pub author: String,

    pub category: String,

    pub tags: HashSet<Tag>,

    /// The cover image, with `src` already resolved to a URL.
    pub image: Option<Image>,

    /// The absolute URL of the post page.
    pub url: Url,

    /// The rendered HTML body.
    pub body: String,

    /// Files that live next to a bundled post's `index.md` and must be copied
    /// next to the rendered post page.
    pub assets: Vec<Asset>,
}

/// A reference to an image and its alt text.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// A file belonging to a post bundle. `relative_path` is relative to the
/// bundle directory and is preserved in the output.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
}

impl Post {
    /// Returns true when the post may appear in listings at time `now`: it is
    /// not a draft and its publish date is strictly in the past.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        !self.draft && self.publish_date < now
    }

    /// Returns the publish date as human-readable text, e.g.
    /// `January 1, 2024`.
    pub fn display_date(&self) -> String {
        self.publish_date.format("%B %-d, %Y").to_string()
    }

    /// Returns the publish date in RFC 3339 form for `<time datetime="">`.
    pub fn iso_date(&self) -> String {
        self.publish_date.to_rfc3339()
    }

    /// Converts a [`Post`] into a template [`Value`] with the fields every
    /// page showing a post needs. Listing pages extend this value with the
    /// display snippet and image loading hints.
    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("slug".to_owned(), (&self.slug).into());
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert("title".to_owned(), (&self.title).into());
        m.insert("snippet".to_owned(), (&self.snippet).into());
        m.insert("author".to_owned(), (&self.author).into());
        m.insert("category".to_owned(), (&self.category).into());
        m.insert("date".to_owned(), Value::String(self.display_date()));
        m.insert("date_iso".to_owned(), Value::String(self.iso_date()));
        m.insert("body".to_owned(), (&self.body).into());

        let mut tags: Vec<&Tag> = self.tags.iter().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        m.insert(
            "tags".to_owned(),
            Value::Array(tags.into_iter().map(Value::from).collect()),
        );
        m.insert(
            "image".to_owned(),
            match &self.image {
                Some(image) => image.to_value(),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}

impl Image {
    fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("src".to_owned(), (&self.src).into());
        m.insert("alt".to_owned(), (&self.alt).into());
        Value::Object(m)
    }
}

/// Parses a publish date. Accepts RFC 3339 (`2024-01-01T09:00:00+02:00`),
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC) and `YYYY-MM-DD` (midnight UTC).
pub fn parse_publish_date(input: &str) -> ParseResult<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::from_utc(naive, Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")?;
    Ok(DateTime::from_utc(date.and_hms(0, 0, 0), Utc))
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use chrono::TimeZone;

    /// Builds a minimal published post for tests in this crate.
    pub(crate) fn post(slug: &str, date: &str) -> Post {
        Post {
            slug: slug.to_owned(),
            draft: false,
            publish_date: parse_publish_date(date).unwrap(),
            title: format!("Title {}", slug),
            snippet: format!("Snippet for {}.", slug),
            author: String::from("Jane"),
            category: String::from("Notes"),
            tags: HashSet::new(),
            image: None,
            url: Url::parse("https://example.org/blog/")
                .unwrap()
                .join(slug)
                .unwrap(),
            body: String::new(),
            assets: Vec::new(),
        }
    }

    #[test]
    fn test_parse_date_only() -> ParseResult<()> {
        assert_eq!(
            Utc.ymd(2024, 1, 1).and_hms(0, 0, 0),
            parse_publish_date("2024-01-01")?
        );
        Ok(())
    }

    #[test]
    fn test_parse_naive_date_time() -> ParseResult<()> {
        assert_eq!(
            Utc.ymd(2024, 1, 1).and_hms(13, 30, 5),
            parse_publish_date("2024-01-01 13:30:05")?
        );
        Ok(())
    }

    #[test]
    fn test_parse_rfc3339_normalizes_to_utc() -> ParseResult<()> {
        assert_eq!(
            Utc.ymd(2024, 1, 1).and_hms(7, 0, 0),
            parse_publish_date("2024-01-01T09:00:00+02:00")?
        );
        Ok(())
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_publish_date("next tuesday").is_err());
        assert!(parse_publish_date("2024-13-01").is_err());
        assert!(parse_publish_date("").is_err());
    }

    #[test]
    fn test_is_published() {
        let now = Utc.ymd(2024, 6, 1).and_hms(0, 0, 0);
        assert!(post("past", "2024-01-01").is_published(now));
        assert!(!post("future", "2099-01-01").is_published(now));
        assert!(!post("now", "2024-06-01").is_published(now));

        let mut draft = post("draft", "2024-01-01");
        draft.draft = true;
        assert!(!draft.is_published(now));
    }

    #[test]
    fn test_dates_for_display() {
        let p = post("a", "2024-03-07T08:09:10Z");
        assert_eq!("March 7, 2024", p.display_date());
        assert_eq!("2024-03-07T08:09:10+00:00", p.iso_date());
    }
}
