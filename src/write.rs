//! Renders listed posts to disk: the paginated main listing, one paginated
//! listing per tag, and one page per post. Drafts and future-dated posts
//! never get here; the caller passes the output of [`crate::lister::list`].

use crate::lister::Projection;
use crate::post::Post;
use gtmpl::{Template, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

const INDEX_FILE: &str = "index.html";

/// Responsible for indexing, templating, and writing HTML pages to disk from
/// listed [`Post`]s.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for listing pages.
    pub index_template: &'a Template,

    /// The base URL for the main listing and for posts. The main listing
    /// pages are `{blog_url}`, `{blog_url}/page/2/`, etc. and a post is
    /// `{blog_url}/{slug}`.
    pub blog_url: &'a Url,

    /// The directory the main listing and post pages are written into. A
    /// post lands in `{blog_output_directory}/{slug}/index.html` next to its
    /// bundle assets.
    pub blog_output_directory: &'a Path,

    /// The directory tag listings are written into, i.e.
    /// `{tags_output_directory}/{tag}/index.html`,
    /// `{tags_output_directory}/{tag}/page/2/index.html`, etc. Tag listing
    /// URLs come from [`crate::tag::Tag::url`].
    pub tags_output_directory: &'a Path,

    /// The number of posts per listing page.
    pub index_page_size: usize,

    /// Derives display snippets and image loading hints for listing pages.
    pub projection: Projection,

    /// The site's title, made available to every template.
    pub site_title: &'a str,

    /// The URL for the site's home page. This is made available to both post
    /// and listing templates, typically as the destination for the
    /// site-header link.
    pub home_page: &'a Url,

    /// The URL for the static assets. This is made available to both post and
    /// listing templates, typically for the theme's stylesheet.
    pub static_url: &'a Url,

    /// The URL of the Atom feed.
    pub feed_url: &'a Url,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "site_title".to_owned(),
                Value::String(self.site_title.to_owned()),
            );
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "blog_url".to_owned(),
                Value::String(self.blog_url.to_string()),
            );
            obj.insert(
                "static_url".to_owned(),
                Value::String(self.static_url.to_string()),
            );
            obj.insert(
                "feed_url".to_owned(),
                Value::String(self.feed_url.to_string()),
            );
        }
        page.template.execute(
            &mut std::fs::File::create(&page.file_path)?,
            &gtmpl::Context::from(value).map_err(Error::Template)?,
        )?;
        Ok(())
    }

    /// Takes listed posts (already filtered and ordered), indexes them by
    /// tag, writes listing and post pages and copies bundle assets. Returns
    /// the number of pages written.
    pub fn write_posts(&self, posts: &[&Post]) -> Result<usize> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let mut written = 0;
        for page in self.pages(posts)? {
            if let Some(dir) = page.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_page(&page)?;
            written += 1;
        }

        for post in posts {
            let post_directory = self.blog_output_directory.join(&post.slug);
            for asset in &post.assets {
                let target = post_directory.join(&asset.relative_path);
                if let Some(dir) = target.parent() {
                    if seen_dirs.insert(dir.to_owned()) {
                        std::fs::create_dir_all(dir)?;
                    }
                }
                std::fs::copy(&asset.source_path, &target)?;
            }
        }

        tracing::debug!(pages = written, "Wrote pages");
        Ok(written)
    }

    /// Creates all of the listing and post [`Page`]s for a set of listed
    /// posts.
    fn pages<'t>(&'t self, posts: &[&Post]) -> Result<Vec<Page<'t>>> {
        let mut pages = Vec::new();
        for index in self.indices(posts) {
            pages.extend(index.to_pages(
                self.index_page_size,
                &self.projection,
                self.index_template,
            )?);
        }
        pages.extend(self.post_pages(posts));
        Ok(pages)
    }

    /// Creates all of the post [`Page`]s. `prev` is the newer neighbor and
    /// `next` the older one.
    fn post_pages<'t>(&'t self, posts: &[&Post]) -> Vec<Page<'t>> {
        posts
            .iter()
            .enumerate()
            .map(|(i, post)| Page {
                item: post.to_value(),
                file_path: self
                    .blog_output_directory
                    .join(&post.slug)
                    .join(INDEX_FILE),
                prev: match i < 1 {
                    true => None,
                    false => Some(posts[i - 1].url.clone()),
                },
                next: posts.get(i + 1).map(|p| p.url.clone()),
                tag: None,
                template: self.posts_template,
            })
            .collect()
    }

    /// Indexes listed posts: one [`Index`] for all posts plus one per tag.
    /// Each index keeps the listing order.
    fn indices<'p>(&self, posts: &[&'p Post]) -> Vec<Index<'p>> {
        let mut tags: BTreeMap<String, Index<'p>> = BTreeMap::new();
        for &post in posts {
            for tag in post.tags.iter() {
                tags.entry(tag.name.clone())
                    .or_insert_with(|| Index {
                        url: tag.url.clone(),
                        output_directory: self.tags_output_directory.join(&tag.name),
                        tag: Some(tag.name.clone()),
                        posts: Vec::new(),
                    })
                    .posts
                    .push(post);
            }
        }

        let mut indices = vec![Index {
            url: self.blog_url.clone(),
            output_directory: self.blog_output_directory.to_owned(),
            tag: None,
            posts: posts.to_vec(),
        }];
        indices.extend(tags.into_iter().map(|(_, index)| index));
        indices
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted to a
/// [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page: a post for post pages, an array of listed
    /// posts for listing pages.
    item: Value,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The tag a listing page is for. `None` for the main listing and posts.
    tag: Option<String>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a [`Value::Object`]
    /// with fields `item`, `prev`, `next` and `tag` (see [`Page`] for
    /// descriptions).
    fn to_value(&self) -> Value {
        let option_to_value = |opt: &Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        m.insert(
            "tag".to_owned(),
            match &self.tag {
                Some(tag) => tag.into(),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}

/// `Index` represents a listing of posts: either every listed post or the
/// listed posts carrying one tag.
struct Index<'a> {
    /// The URL of the index's first page. Ends in a trailing slash.
    url: Url,

    /// The output directory for the index's pages.
    output_directory: PathBuf,

    /// The tag, for tag listings.
    tag: Option<String>,

    /// The posts in listing order.
    posts: Vec<&'a Post>,
}

impl Index<'_> {
    fn page_url(&self, i: usize) -> std::result::Result<Url, url::ParseError> {
        match i {
            0 => Ok(self.url.clone()),
            _ => self.url.join(&format!("page/{}/", i + 1)),
        }
    }

    fn page_file(&self, i: usize) -> PathBuf {
        match i {
            0 => self.output_directory.join(INDEX_FILE),
            _ => self
                .output_directory
                .join("page")
                .join((i + 1).to_string())
                .join(INDEX_FILE),
        }
    }

    /// Converts the index to a list of listing pages. An index without posts
    /// still gets one (empty) page. Image loading hints restart on every
    /// page since each page is loaded on its own.
    fn to_pages<'t>(
        &self,
        index_page_size: usize,
        projection: &Projection,
        index_template: &'t Template,
    ) -> Result<Vec<Page<'t>>> {
        let empty: &[&Post] = &[];
        let chunks: Vec<&[&Post]> = match self.posts.is_empty() {
            true => vec![empty],
            false => self.posts.chunks(index_page_size).collect(),
        };
        let total_pages = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| -> Result<Page<'t>> {
                Ok(Page {
                    item: Value::Array(
                        projection
                            .project(chunk)
                            .iter()
                            .map(|listed| listed.to_value())
                            .collect(),
                    ),
                    file_path: self.page_file(i),
                    prev: match i {
                        0 => None,
                        _ => Some(self.page_url(i - 1)?),
                    },
                    next: match i < total_pages - 1 {
                        false => None,
                        true => Some(self.page_url(i + 1)?),
                    },
                    tag: self.tag.clone(),
                    template: index_template,
                })
            })
            .collect()
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error building a listing page URL.
    UrlParse(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`].
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}
