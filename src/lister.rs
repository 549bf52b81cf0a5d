//! The post selection-and-ordering pipeline. [`list`] filters out drafts and
//! future-dated posts and orders the rest newest first; [`Projection`] turns
//! the result into display-ready [`ListedPost`]s for listing pages.

use crate::post::Post;
use chrono::{DateTime, Utc};
use gtmpl::Value;
use std::collections::HashSet;
use std::fmt;

/// The number of leading entries on a listing page whose images load
/// eagerly.
pub const EAGER_IMAGES: usize = 3;

/// The maximum number of characters of a snippet shown on listing pages.
pub const SNIPPET_LENGTH: usize = 90;

/// Appended to every display snippet.
pub const ELLIPSIS: &str = "...";

/// Returns the posts that are published at `now`, most recent first. Posts
/// sharing a publish date keep their relative input order.
pub fn list(posts: &[Post], now: DateTime<Utc>) -> Vec<&Post> {
    let mut listed: Vec<&Post> =
        posts.iter().filter(|p| p.is_published(now)).collect();

    // `sort_by` is stable.
    listed.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
    listed
}

/// Fails on the first slug that appears more than once.
pub fn check_slugs(posts: &[Post]) -> Result<(), DuplicateSlugError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(posts.len());
    for post in posts {
        if !seen.insert(post.slug.as_str()) {
            return Err(DuplicateSlugError(post.slug.clone()));
        }
    }
    Ok(())
}

/// Truncates `snippet` to its first `max_chars` characters, trims it,
/// strips trailing periods and appends [`ELLIPSIS`].
pub fn display_snippet(snippet: &str, max_chars: usize) -> String {
    let end = snippet
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or_else(|| snippet.len());
    let truncated = snippet[..end]
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    format!("{}{}", truncated, ELLIPSIS)
}

/// A hint for how a listing entry's image should be fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Loading {
    Eager,
    Lazy,
}

impl Loading {
    /// The value for the `<img loading="">` attribute.
    pub fn loading(self) -> &'static str {
        match self {
            Loading::Eager => "eager",
            Loading::Lazy => "lazy",
        }
    }

    /// The value for the `<img decoding="">` attribute.
    pub fn decoding(self) -> &'static str {
        match self {
            Loading::Eager => "sync",
            Loading::Lazy => "async",
        }
    }
}

/// A listed post plus the fields derived for display.
#[derive(Clone, Debug, PartialEq)]
pub struct ListedPost<'a> {
    pub post: &'a Post,
    pub snippet: String,
    pub loading: Loading,
}

impl ListedPost<'_> {
    /// Converts a [`ListedPost`] into a template [`Value`]: the post's own
    /// fields (see [`Post::to_value`]) with `snippet` replaced by the display
    /// snippet, and `loading`/`decoding` attributes for the image.
    pub fn to_value(&self) -> Value {
        let mut value = self.post.to_value();
        if let Value::Object(m) = &mut value {
            m.insert("snippet".to_owned(), (&self.snippet).into());
            m.insert(
                "loading".to_owned(),
                Value::String(self.loading.loading().to_owned()),
            );
            m.insert(
                "decoding".to_owned(),
                Value::String(self.loading.decoding().to_owned()),
            );
        }
        value
    }
}

/// Settings for deriving [`ListedPost`]s.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    pub snippet_length: usize,
    pub eager_images: usize,
}

impl Default for Projection {
    fn default() -> Self {
        Projection {
            snippet_length: SNIPPET_LENGTH,
            eager_images: EAGER_IMAGES,
        }
    }
}

impl Projection {
    /// Derives the display fields for an already-listed sequence of posts.
    /// Order is preserved.
    pub fn project<'a>(&self, posts: &[&'a Post]) -> Vec<ListedPost<'a>> {
        posts
            .iter()
            .enumerate()
            .map(|(i, post)| ListedPost {
                post,
                snippet: display_snippet(&post.snippet, self.snippet_length),
                loading: match i < self.eager_images {
                    true => Loading::Eager,
                    false => Loading::Lazy,
                },
            })
            .collect()
    }
}

/// Returned by [`check_slugs`] when two posts share a slug.
#[derive(Debug, PartialEq)]
pub struct DuplicateSlugError(pub String);

impl fmt::Display for DuplicateSlugError {
    /// Displays a [`DuplicateSlugError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "duplicate post slug `{}`", &self.0)
    }
}

impl std::error::Error for DuplicateSlugError {
    /// Implements the [`std::error::Error`] trait for [`DuplicateSlugError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
