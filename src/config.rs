//! Loads a [`Config`] from a `postlist.yaml` project file and the theme's
//! `theme/theme.yaml`.

use crate::lister::{EAGER_IMAGES, SNIPPET_LENGTH};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The project file name searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "postlist.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct SnippetLength(usize);
impl Default for SnippetLength {
    fn default() -> Self {
        SnippetLength(SNIPPET_LENGTH)
    }
}

#[derive(Deserialize)]
struct EagerImages(usize);
impl Default for EagerImages {
    fn default() -> Self {
        EagerImages(EAGER_IMAGES)
    }
}

#[derive(Deserialize)]
struct LogLevel(String);
impl Default for LogLevel {
    fn default() -> Self {
        LogLevel(String::from("info"))
    }
}

#[derive(Deserialize)]
struct Project {
    title: String,
    site_root: Url,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default)]
    index_page_size: PageSize,

    #[serde(default)]
    snippet_length: SnippetLength,

    #[serde(default)]
    eager_images: EagerImages,

    #[serde(default)]
    log_level: LogLevel,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
}

/// The site author, used for the feed and for posts without an `author`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// Everything a build needs to know about the project and the output
/// location. URLs ending in `_url` always end in a trailing slash.
pub struct Config {
    pub title: String,
    pub author: Option<Author>,
    pub home_page: Url,
    pub posts_source_directory: PathBuf,
    pub blog_url: Url,
    pub blog_output_directory: PathBuf,
    pub tags_url: Url,
    pub tags_output_directory: PathBuf,
    pub static_url: Url,
    pub static_source_directory: PathBuf,
    pub static_output_directory: PathBuf,
    pub feed_url: Url,
    pub root_output_directory: PathBuf,
    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub index_page_size: usize,
    pub snippet_length: usize,
    pub eager_images: usize,
    pub log_level: String,
}

impl Config {
    /// Searches `dir` and its ancestors for a [`PROJECT_FILE`] and loads
    /// it.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.is_file() {
            Config::from_project_file(&path, output_directory)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(Error::MissingProjectFile),
            }
        }
    }

    /// Loads the project file at `path` and the theme next to it.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path)?)
            .map_err(|err| Error::Deserialize { path: path.to_owned(), err })?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::MissingParentDirectory(path.to_owned()))?;

        let theme_dir = project_root.join("theme");
        let theme_path = theme_dir.join("theme.yaml");
        let theme: Theme = serde_yaml::from_reader(open(&theme_path)?)
            .map_err(|err| Error::Deserialize { path: theme_path.clone(), err })?;

        if project.index_page_size.0 < 1 {
            return Err(Error::InvalidPageSize);
        }

        // `Url::join` treats the last path segment as a file name unless it
        // ends in a slash.
        let site_root = match project.site_root.path().ends_with('/') {
            true => project.site_root,
            false => {
                let mut url = project.site_root.clone();
                url.set_path(&format!("{}/", project.site_root.path()));
                url
            }
        };

        Ok(Config {
            title: project.title,
            author: project.author,
            posts_source_directory: project_root.join("posts"),
            blog_url: site_root.join("blog/")?,
            blog_output_directory: output_directory.join("blog"),
            tags_url: site_root.join("tags/")?,
            tags_output_directory: output_directory.join("tags"),
            static_url: site_root.join("static/")?,
            static_source_directory: theme_dir.join("static"),
            static_output_directory: output_directory.join("static"),
            feed_url: site_root.join("feed.atom")?,
            root_output_directory: output_directory.to_owned(),
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            posts_template: theme
                .posts_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            index_page_size: project.index_page_size.0,
            snippet_length: project.snippet_length.0,
            eager_images: project.eager_images.0,
            log_level: project.log_level.0,
            home_page: site_root,
        })
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or any parent.
    MissingProjectFile,

    /// Returned when the project file has no parent directory.
    MissingParentDirectory(PathBuf),

    /// Returned when a project or theme file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when a project or theme file isn't valid.
    Deserialize { path: PathBuf, err: serde_yaml::Error },

    /// Returned when `index_page_size` is zero.
    InvalidPageSize,

    /// Returned when a site URL can't be derived from `site_root`.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingProjectFile => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::MissingParentDirectory(path) => write!(
                f,
                "Can't get parent directory for project file '{}'",
                path.display()
            ),
            Error::Open { path, err } => {
                write!(f, "Opening '{}': {}", path.display(), err)
            }
            Error::Deserialize { path, err } => {
                write!(f, "Loading '{}': {}", path.display(), err)
            }
            Error::InvalidPageSize => {
                write!(f, "`index_page_size` must be at least 1")
            }
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingProjectFile => None,
            Error::MissingParentDirectory(_) => None,
            Error::Open { path: _, err } => Some(err),
            Error::Deserialize { path: _, err } => Some(err),
            Error::InvalidPageSize => None,
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator when deriving site URLs.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let output = Path::new("/tmp/postlist-out");
        let config = Config::from_directory(Path::new("./testdata/project/theme"), output)?;
        assert_eq!("Test Blog", config.title);
        assert_eq!("https://example.org/site/", config.home_page.as_str());
        assert_eq!("https://example.org/site/blog/", config.blog_url.as_str());
        assert_eq!("https://example.org/site/tags/", config.tags_url.as_str());
        assert_eq!(
            "https://example.org/site/feed.atom",
            config.feed_url.as_str()
        );
        assert_eq!(output.join("blog"), config.blog_output_directory);
        assert_eq!(
            Path::new("./testdata/project/posts"),
            config.posts_source_directory
        );
        assert_eq!(
            vec![Path::new("./testdata/project/theme/index.html")],
            config.index_template
        );
        assert_eq!(
            Some(Author {
                name: String::from("Jane"),
                email: Some(String::from("jane@example.org")),
            }),
            config.author
        );
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::from_directory(
            Path::new("./testdata/project"),
            Path::new("/tmp/postlist-out"),
        )?;
        assert_eq!(2, config.index_page_size);
        assert_eq!(SNIPPET_LENGTH, config.snippet_length);
        assert_eq!(EAGER_IMAGES, config.eager_images);
        assert_eq!("info", config.log_level);
        Ok(())
    }

    #[test]
    fn test_missing_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere");
        assert!(matches!(
            Config::from_project_file(&missing.join(PROJECT_FILE), Path::new("/tmp/out")),
            Err(Error::Open { .. })
        ));
    }

    #[test]
    fn test_zero_page_size_rejected() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("theme")).unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            "title: T\nsite_root: https://example.org/\nindex_page_size: 0\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("theme").join("theme.yaml"),
            "index_template: [index.html]\nposts_template: [post.html]\n",
        )
        .unwrap();
        assert!(matches!(
            Config::from_directory(dir.path(), Path::new("/tmp/out")),
            Err(Error::InvalidPageSize)
        ));
        Ok(())
    }
}
