//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::lister::ListedPost;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<Author>,
    pub home_page: Url,

    /// The feed's `updated` timestamp. Builds pass the same `now` used to
    /// select posts.
    pub updated: DateTime<Utc>,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and listed posts
/// and writes the result to a [`std::io::Write`]. Entries keep the listing
/// order. This function takes ownership of the provided [`FeedConfig`].
pub fn write_feed<W: Write>(config: FeedConfig, posts: &[ListedPost], w: W) -> Result<()> {
    feed(config, posts).write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, posts: &[ListedPost]) -> Feed {
    let mut feed = Feed::default();
    feed.set_entries(feed_entries(&config, posts));
    feed.set_title(config.title);
    feed.set_id(config.id);
    feed.set_updated(fixed(config.updated));
    feed.set_authors(author_to_people(config.author));
    feed.set_links(vec![alternate(config.home_page.to_string())]);
    feed
}

fn feed_entries(config: &FeedConfig, posts: &[ListedPost]) -> Vec<Entry> {
    posts
        .iter()
        .map(|listed| {
            let post = listed.post;
            let date = fixed(post.publish_date);

            let mut categories = Vec::new();
            if !post.category.is_empty() {
                categories.push(category(&post.category));
            }
            let mut tags: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
            tags.sort_unstable();
            categories.extend(tags.into_iter().map(category));

            let authors = match post.author.is_empty() {
                true => author_to_people(config.author.clone()),
                false => vec![person(post.author.clone(), None)],
            };

            let mut entry = Entry::default();
            entry.set_id(post.url.to_string());
            entry.set_title(post.title.clone());
            entry.set_updated(date);
            entry.set_published(Some(date));
            entry.set_authors(authors);
            entry.set_links(vec![alternate(post.url.to_string())]);
            entry.set_summary(Some(Text::plain(listed.snippet.clone())));
            entry.set_categories(categories);
            entry
        })
        .collect()
}

fn fixed(date: DateTime<Utc>) -> DateTime<FixedOffset> {
    date.into()
}

fn alternate(href: String) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn category(term: &str) -> Category {
    let mut category = Category::default();
    category.set_term(term);
    category
}

fn person(name: String, email: Option<String>) -> Person {
    let mut person = Person::default();
    person.set_name(name);
    person.set_email(email);
    person
}

fn author_to_people(author: Option<Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![person(author.name, author.email)],
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O and Atom
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
