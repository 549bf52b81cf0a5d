//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the posts
//! ([`crate::source`]), selecting and ordering them ([`crate::lister`]),
//! rendering listing and post pages ([`crate::write`]), copying the theme's
//! static directory, and generating the Atom feed.

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::lister::{check_slugs, list, DuplicateSlugError, Projection};
use crate::source::{DirectorySource, Error as SourceError, PostSource};
use crate::write::{Error as WriteError, Writer};
use chrono::{DateTime, Utc};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Builds the site from a [`Config`] object, listing posts published
/// before `now`.
pub fn build_site(config: Config, now: DateTime<Utc>) -> Result<()> {
    let source = DirectorySource::new(
        &config.posts_source_directory,
        &config.blog_url,
        &config.tags_url,
        config.author.as_ref().map(|a| a.name.as_str()),
    );
    build_from_source(&source, &config, now)
}

/// Builds the site from any [`PostSource`]. [`build_site`] uses the posts
/// directory named in the [`Config`].
pub fn build_from_source(
    source: &dyn PostSource,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let posts = source.fetch_all()?;
    check_slugs(&posts)?;

    let listed = list(&posts, now);
    tracing::info!(
        loaded = posts.len(),
        listed = listed.len(),
        excluded = posts.len() - listed.len(),
        "Selected posts"
    );

    // Parse the template files.
    let index_template = parse_template(config.index_template.iter())?;
    let posts_template = parse_template(config.posts_template.iter())?;

    // Blow away the old output directories so we don't have any collisions.
    // The root output directory itself is left alone in case it was passed by
    // mistake.
    rmdir(&config.blog_output_directory)?;
    rmdir(&config.tags_output_directory)?;
    rmdir(&config.static_output_directory)?;

    let projection = Projection {
        snippet_length: config.snippet_length,
        eager_images: config.eager_images,
    };

    // write the listing and post pages
    let writer = Writer {
        posts_template: &posts_template,
        index_template: &index_template,
        blog_url: &config.blog_url,
        blog_output_directory: &config.blog_output_directory,
        tags_output_directory: &config.tags_output_directory,
        index_page_size: config.index_page_size,
        projection,
        site_title: &config.title,
        home_page: &config.home_page,
        static_url: &config.static_url,
        feed_url: &config.feed_url,
    };
    let pages = writer.write_posts(&listed)?;
    tracing::info!(pages, directory = %config.root_output_directory.display(), "Wrote pages");

    // copy static directory
    if config.static_source_directory.is_dir() {
        copy_dir(
            &config.static_source_directory,
            &config.static_output_directory,
        )?;
    } else {
        tracing::debug!(
            directory = %config.static_source_directory.display(),
            "No static directory"
        );
    }

    // copy /blog/index.html to /index.html
    let _ = std::fs::copy(
        &config.blog_output_directory.join("index.html"),
        &config.root_output_directory.join("index.html"),
    )?;

    // create the atom feed from the whole listing, unpaginated
    let feed_path = config.root_output_directory.join("feed.atom");
    write_feed(
        FeedConfig {
            title: config.title.clone(),
            id: config.home_page.to_string(),
            author: config.author.clone(),
            home_page: config.home_page.clone(),
            updated: now,
        },
        &projection.project(&listed),
        File::create(&feed_path)?,
    )?;
    tracing::info!(path = %feed_path.display(), entries = listed.len(), "Wrote feed");

    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during loading posts,
/// writing, cleaning output directories, parsing template files, and other
/// I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading posts.
    Source(SourceError),

    /// Returned when two posts share a slug.
    DuplicateSlug(DuplicateSlugError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Source(err) => err.fmt(f),
            Error::DuplicateSlug(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Source(err) => Some(err),
            Error::DuplicateSlug(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<SourceError> for Error {
    /// Converts [`SourceError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: SourceError) -> Error {
        Error::Source(err)
    }
}

impl From<DuplicateSlugError> for Error {
    /// Converts [`DuplicateSlugError`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: DuplicateSlugError) -> Error {
        Error::DuplicateSlug(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::parse_publish_date;
    use crate::post::test::post;
    use std::fs::read_to_string;

    fn config(output: &Path) -> Config {
        let mut config =
            Config::from_directory(Path::new("./testdata/project"), output).unwrap();
        config.posts_source_directory = PathBuf::from("./testdata/posts");
        config
    }

    fn now() -> DateTime<Utc> {
        parse_publish_date("2024-06-01").unwrap()
    }

    #[test]
    fn test_build_site() -> Result<()> {
        let out = tempfile::tempdir()?;
        let config = config(out.path());
        build_site(config, now())?;

        let index = read_to_string(out.path().join("blog/index.html"))?;
        assert!(index.contains("https://example.org/site/blog/photo-essay"), "{}", index);
        assert!(index.contains("https://example.org/site/blog/hello-world"), "{}", index);
        assert!(!index.contains("unfinished"), "{}", index);
        assert!(!index.contains("future"), "{}", index);

        // newest first
        assert!(index.find("photo-essay") < index.find("hello-world"), "{}", index);

        assert_eq!(index, read_to_string(out.path().join("index.html"))?);
        assert!(out.path().join("blog/hello-world/index.html").is_file());
        assert!(out.path().join("blog/photo-essay/cover.svg").is_file());
        assert!(!out.path().join("blog/unfinished").exists());
        assert!(!out.path().join("blog/future-plans").exists());
        assert!(out.path().join("tags/rust/index.html").is_file());
        assert!(out.path().join("static/style.css").is_file());

        let feed = read_to_string(out.path().join("feed.atom"))?;
        assert!(feed.contains("https://example.org/site/blog/hello-world"), "{}", feed);
        assert!(!feed.contains("future-plans"), "{}", feed);
        Ok(())
    }

    #[test]
    fn test_build_empty_listing() -> Result<()> {
        let out = tempfile::tempdir()?;
        let source: Vec<crate::post::Post> = Vec::new();
        build_from_source(&source, &config(out.path()), now())?;
        assert!(out.path().join("blog/index.html").is_file());
        assert!(out.path().join("feed.atom").is_file());
        Ok(())
    }

    #[test]
    fn test_build_rejects_duplicate_slugs() {
        let out = tempfile::tempdir().unwrap();
        let source = vec![post("a", "2024-01-01"), post("a", "2024-02-01")];
        assert!(matches!(
            build_from_source(&source, &config(out.path()), now()),
            Err(Error::DuplicateSlug(_))
        ));
    }

    #[test]
    fn test_build_fails_on_bad_date() {
        let out = tempfile::tempdir().unwrap();
        let mut config = config(out.path());
        config.posts_source_directory = PathBuf::from("./testdata/bad-date");
        match build_site(config, now()) {
            Err(err) => assert!(err.to_string().contains("broken"), "{}", err),
            Ok(_) => panic!("wanted an error"),
        }
        assert!(!out.path().join("blog").exists());
    }
}
