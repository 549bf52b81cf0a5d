//! Defines the [`PostSource`] capability and [`DirectorySource`], which loads
//! [`Post`]s from markdown files with YAML front matter.

use std::{
    collections::HashSet,
    fmt,
    fs::{read_dir, File},
    path::Path,
};

use serde::Deserialize;
use url::Url;

use crate::{
    markdown,
    post::{parse_publish_date, Asset, Image, Post},
    tag::Tag,
};

const MARKDOWN_EXTENSION: &str = ".md";
const BUNDLE_INDEX: &str = "index.md";

/// Supplies the full, unordered set of [`Post`]s. The lister never knows how
/// or where the records are stored.
pub trait PostSource {
    fn fetch_all(&self) -> Result<Vec<Post>>;
}

impl PostSource for Vec<Post> {
    fn fetch_all(&self) -> Result<Vec<Post>> {
        Ok(self.clone())
    }
}

/// Loads posts from a directory. Each `*.md` file is a post whose default
/// slug is the file stem; each subdirectory containing an `index.md` is a
/// post bundle whose default slug is the directory name and whose other
/// files become the post's [`Asset`]s.
pub struct DirectorySource<'a> {
    /// The directory holding the post source files.
    source_directory: &'a Path,

    /// `blog_url` is the base URL for post pages (i.e., the URL for a post
    /// is `{blog_url}/{slug}`). Must end in a trailing slash.
    blog_url: &'a Url,

    /// `tags_url` is the base URL for tag listings. Must end in a trailing
    /// slash.
    tags_url: &'a Url,

    /// Used for posts whose front matter has no `author`.
    default_author: Option<&'a str>,
}

impl<'a> DirectorySource<'a> {
    /// Constructs a new source. See fields on [`DirectorySource`] for
    /// argument descriptions.
    pub fn new(
        source_directory: &'a Path,
        blog_url: &'a Url,
        tags_url: &'a Url,
        default_author: Option<&'a str>,
    ) -> DirectorySource<'a> {
        DirectorySource {
            source_directory,
            blog_url,
            tags_url,
            default_author,
        }
    }

    fn parse_post_bundle(&self, bundle_directory: &Path, name: &str) -> Result<Post> {
        // Parse the post before walking the bundle so a bad post fails
        // without touching anything else.
        let mut post = self.parse_post(&bundle_directory.join(BUNDLE_INDEX), name)?;

        use walkdir::WalkDir;
        for result in WalkDir::new(bundle_directory) {
            let entry = result?;
            if entry.file_type().is_file() && entry.path() != bundle_directory.join(BUNDLE_INDEX) {
                if let Ok(relative_path) = entry.path().strip_prefix(bundle_directory) {
                    post.assets.push(Asset {
                        source_path: entry.path().to_owned(),
                        relative_path: relative_path.to_owned(),
                    });
                }
            }
        }
        post.assets.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok(post)
    }

    /// Parses a single [`Post`] from the file at `path`. `name` is the file
    /// stem (or bundle directory name) and is the default slug.
    fn parse_post(&self, path: &Path, name: &str) -> Result<Post> {
        match self._parse_post(path, name) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", name),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(&self, path: &Path, name: &str) -> Result<Post> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let input: &str = &contents;

        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let frontmatter: Frontmatter = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;

        let slug = slug::slugify(frontmatter.slug.as_deref().unwrap_or(name));
        if slug.is_empty() {
            return Err(Error::EmptySlug);
        }

        let publish_date = parse_publish_date(&frontmatter.publish_date).map_err(|err| {
            Error::InvalidPublishDate {
                slug: slug.clone(),
                value: frontmatter.publish_date.clone(),
                err,
            }
        })?;

        // Relative asset references resolve against the post's own
        // directory, so that URL needs its trailing slash.
        let assets_url = self.blog_url.join(&format!("{}/", slug))?;

        let mut post = Post {
            url: self.blog_url.join(&slug)?,
            slug,
            draft: frontmatter.draft,
            publish_date,
            title: frontmatter.title,
            snippet: frontmatter.snippet,
            author: match frontmatter.author {
                Some(author) => author,
                None => self.default_author.unwrap_or_default().to_owned(),
            },
            category: frontmatter.category,
            tags: frontmatter
                .tags
                .iter()
                .map(|t| Tag::new(t, self.tags_url))
                .collect::<std::result::Result<HashSet<Tag>, url::ParseError>>()?,
            image: match frontmatter.image {
                Some(image) => Some(Image {
                    src: assets_url.join(&image.src)?.to_string(),
                    alt: image.alt,
                }),
                None => None,
            },
            body: String::default(),
            assets: Vec::new(),
        };

        markdown::to_html(
            &mut post.body,
            self.blog_url,
            &assets_url,
            &input[body_start..],
        )?;
        Ok(post)
    }

    fn is_bundle(entry: &std::fs::DirEntry) -> std::io::Result<bool> {
        Ok(entry.file_type()?.is_dir() && entry.path().join(BUNDLE_INDEX).is_file())
    }
}

impl PostSource for DirectorySource<'_> {
    /// Searches the source directory for post files and bundles and parses
    /// each one. Each post file must be structured as follows:
    ///
    /// 1. Initial front matter fence (`---`)
    /// 2. YAML front matter with fields `title`, `publishDate`, `snippet` and
    ///    optionally `slug`, `draft`, `author`, `category`, `tags`, `image`
    /// 3. Terminal front matter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// publishDate: 2021-04-16
    /// snippet: A greeting.
    /// tags: [greet]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    ///
    /// Any malformed post fails the whole fetch. Posts are returned in file
    /// name order so the result does not depend on directory iteration
    /// order.
    fn fetch_all(&self) -> Result<Vec<Post>> {
        let mut entries = Vec::new();
        for result in read_dir(self.source_directory)? {
            entries.push(result?);
        }
        entries.sort_by_key(|entry| entry.file_name());

        let mut posts = Vec::new();
        for entry in entries {
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            if Self::is_bundle(&entry)? {
                posts.push(self.parse_post_bundle(&entry.path(), &file_name)?);
            } else if file_name.ends_with(MARKDOWN_EXTENSION) {
                posts.push(self.parse_post(
                    &entry.path(),
                    file_name.trim_end_matches(MARKDOWN_EXTENSION),
                )?);
            }
        }

        tracing::debug!(
            directory = %self.source_directory.display(),
            count = posts.len(),
            "Fetched posts"
        );
        Ok(posts)
    }
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    // The closing fence is a line of its own; `---` inside a value is data.
    let closing = input[FENCE.len()..]
        .match_indices("\n---")
        .map(|(offset, _)| FENCE.len() + offset + 1)
        .find(|&stop| {
            let rest = &input[stop + FENCE.len()..];
            rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n")
        });
    match closing {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(yaml_stop) => Ok((
            FENCE.len(),             // yaml_start
            yaml_stop,               // yaml_stop
            yaml_stop + FENCE.len(), // body_start
        )),
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct Frontmatter {
    pub title: String,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub draft: bool,

    /// Kept as text so that a bad value can be reported with the slug.
    pub publish_date: String,

    pub snippet: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: HashSet<String>,

    #[serde(default)]
    pub image: Option<Image>,
}

/// Represents the result of a [`PostSource`] fetch.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading [`Post`] objects.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting front matter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal front matter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the front matter as YAML,
    /// including missing required fields.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a post's `publishDate` can't be parsed.
    InvalidPublishDate {
        slug: String,
        value: String,
        err: chrono::ParseError,
    },

    /// Returned when a post's slug slugifies to nothing.
    EmptySlug,

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidPublishDate { slug, value, err } => write!(
                f,
                "post `{}` has invalid publishDate `{}`: {}",
                slug, value, err
            ),
            Error::EmptySlug => write!(f, "post slug is empty"),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidPublishDate { err, .. } => Some(err),
            Error::EmptySlug => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    struct Fixture {
        blog_url: Url,
        tags_url: Url,
    }

    impl Fixture {
        fn new() -> Fixture {
            Fixture {
                blog_url: Url::parse("https://example.com/blog/").unwrap(),
                tags_url: Url::parse("https://example.com/tags/").unwrap(),
            }
        }

        fn fetch(&self, dir: &str) -> Result<Vec<Post>> {
            DirectorySource::new(
                Path::new(dir),
                &self.blog_url,
                &self.tags_url,
                Some("Site Author"),
            )
            .fetch_all()
        }
    }

    fn by_slug<'a>(posts: &'a [Post], slug: &str) -> &'a Post {
        posts.iter().find(|p| p.slug == slug).unwrap()
    }

    #[test]
    fn test_fetch_posts() -> Result<()> {
        let posts = Fixture::new().fetch("./testdata/posts/")?;
        let mut slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        slugs.sort();
        assert_eq!(
            vec!["future-plans", "hello-world", "photo-essay", "unfinished"],
            slugs
        );

        let hello = by_slug(&posts, "hello-world");
        assert_eq!("Hello, world!", hello.title);
        assert_eq!(Utc.ymd(2024, 1, 1).and_hms(9, 0, 0), hello.publish_date);
        assert_eq!("https://example.com/blog/hello-world", hello.url.as_str());
        assert_eq!("Jane", hello.author);
        assert_eq!("Notes", hello.category);
        assert!(!hello.draft);
        assert!(hello.body.contains("<h2>Hello</h2>"));

        let mut tags: Vec<&str> = hello.tags.iter().map(|t| t.name.as_str()).collect();
        tags.sort();
        assert_eq!(vec!["rust", "web-dev"], tags);
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let posts = Fixture::new().fetch("./testdata/posts/")?;
        let unfinished = by_slug(&posts, "unfinished");
        assert!(unfinished.draft);
        assert_eq!("Site Author", unfinished.author);
        assert_eq!("", unfinished.category);
        assert!(unfinished.tags.is_empty());
        assert_eq!(None, unfinished.image);
        Ok(())
    }

    #[test]
    fn test_bundle() -> Result<()> {
        let posts = Fixture::new().fetch("./testdata/posts/")?;
        let bundle = by_slug(&posts, "photo-essay");
        assert_eq!(
            Some(Image {
                src: String::from("https://example.com/blog/photo-essay/cover.svg"),
                alt: String::from("A plain cover"),
            }),
            bundle.image
        );
        assert_eq!(
            vec![PathBuf::from("cover.svg")],
            bundle
                .assets
                .iter()
                .map(|a| a.relative_path.clone())
                .collect::<Vec<PathBuf>>()
        );
        Ok(())
    }

    #[test]
    fn test_slug_override() -> Result<()> {
        let posts = Fixture::new().fetch("./testdata/posts/")?;
        // The source file is `2099-plans.md`.
        let future = by_slug(&posts, "future-plans");
        assert_eq!("https://example.com/blog/future-plans", future.url.as_str());
        Ok(())
    }

    #[test]
    fn test_invalid_publish_date_names_slug() {
        match Fixture::new().fetch("./testdata/bad-date/") {
            Err(Error::Annotated(_, err)) => match *err {
                Error::InvalidPublishDate { slug, value, .. } => {
                    assert_eq!("broken", slug);
                    assert_eq!("sometime soon", value);
                }
                other => panic!("unexpected error: {}", other),
            },
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("wanted an error"),
        }
    }

    #[test]
    fn test_missing_field_fails() {
        let err = Fixture::new().fetch("./testdata/missing-field/").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no-date"), "{}", message);
        assert!(message.contains("publishDate"), "{}", message);
    }

    #[test]
    fn test_frontmatter_indices() {
        assert!(matches!(
            frontmatter_indices("title: x"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            frontmatter_indices("---\ntitle: x\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        assert!(matches!(frontmatter_indices("---\na: b\n---\nbody"), Ok((3, 9, 12))));
        assert!(matches!(frontmatter_indices("---\na: b\n---"), Ok((3, 9, 12))));
        assert!(matches!(
            frontmatter_indices("---\na: b\n----\nbody"),
            Err(Error::FrontmatterMissingEndFence)
        ));
    }

    #[test]
    fn test_dashes_inside_frontmatter_value() -> Result<()> {
        let input = "---\ntitle: Before --- after\nsnippet: x\n---\nbody";
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        assert_eq!(
            "\ntitle: Before --- after\nsnippet: x\n",
            &input[yaml_start..yaml_stop]
        );
        assert_eq!("\nbody", &input[body_start..]);
        Ok(())
    }

    #[test]
    fn test_vec_source() -> Result<()> {
        let posts = vec![crate::post::test::post("a", "2024-01-01")];
        assert_eq!(posts, posts.fetch_all()?);
        Ok(())
    }
}
