use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};
use url::{ParseError, Url};

const MARKDOWN_EXTENSION: &str = ".md";
const BUNDLE_INDEX: &str = "index.md";

/// Converts markdown to HTML, appending the result to `w`.
///
/// * `blog_url` is the prefix for post URLs (e.g.,
///   `https://example.org/blog/`). This should end in a trailing slash.
/// * `assets_url` is the URL relative asset references (images, downloads)
///   resolve against, i.e. `{blog_url}/{slug}/`.
pub fn to_html(
    w: &mut String,
    blog_url: &Url,
    assets_url: &Url,
    markdown: &str,
) -> Result<(), ParseError> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let converter = EventConverter {
        blog_url,
        assets_url,
    };
    let events = Parser::new_ext(markdown, options)
        .map(|ev| converter.convert(ev))
        .collect::<Result<Vec<Event>, ParseError>>()?;
    html::push_html(w, events.into_iter());
    Ok(())
}

struct EventConverter<'a> {
    blog_url: &'a Url,
    assets_url: &'a Url,
}

impl<'a> EventConverter<'a> {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Result<Tag<'b>, ParseError> {
        Ok(match tag {
            // The post title is the page's h1, so `#` in a post body becomes
            // h2.
            Tag::Heading(level) => Tag::Heading((level + 1).min(6)),

            Tag::Link(
                link @ (LinkType::Inline
                | LinkType::Reference
                | LinkType::Shortcut
                | LinkType::Collapsed),
                url,
                title,
            ) => Tag::Link(link, self.convert_url(url)?, title),

            Tag::Image(link, url, title) => {
                Tag::Image(link, self.convert_url(url)?, title)
            }
            _ => tag,
        })
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Result<Event<'b>, ParseError> {
        Ok(match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)?),
            Event::End(tag) => Event::End(self.convert_tag(tag)?),
            _ => ev,
        })
    }

    /// Absolute URLs and fragments pass through. Relative links to sibling
    /// posts (`other.md`, `other/index.md`) point at the rendered post;
    /// anything else is an asset relative to the post bundle.
    fn convert_url<'b>(&self, url: CowStr<'b>) -> Result<CowStr<'b>, ParseError> {
        if url.starts_with('#') {
            return Ok(url);
        }
        match Url::parse(&url) {
            Ok(_) => return Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(e),
        }

        let converted = match post_slug(&url) {
            Some(slug) => self.blog_url.join(&slug)?,
            None => self.assets_url.join(&url)?,
        };
        Ok(CowStr::Boxed(converted.to_string().into_boxed_str()))
    }
}

/// Returns the slug a relative markdown link refers to, if it refers to a
/// post at all.
fn post_slug(relative: &str) -> Option<String> {
    let path = relative.split(|c: char| c == '#' || c == '?').next()?;
    let stem = match path.rsplit('/').next() {
        Some(BUNDLE_INDEX) => path[..path.len() - BUNDLE_INDEX.len()].trim_end_matches('/'),
        _ => path.strip_suffix(MARKDOWN_EXTENSION)?,
    };
    let name = stem.rsplit('/').next()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(slug::slugify(name))
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(markdown: &str) -> Result<String, ParseError> {
        let blog_url = Url::parse("https://example.org/blog/")?;
        let assets_url = blog_url.join("hello/")?;
        let mut html = String::new();
        to_html(&mut html, &blog_url, &assets_url, markdown)?;
        Ok(html)
    }

    #[test]
    fn test_headings_are_demoted() -> Result<(), ParseError> {
        assert_eq!("<h2>Title</h2>\n", render("# Title")?);
        assert_eq!("<h6>Deep</h6>\n", render("###### Deep")?);
        Ok(())
    }

    #[test]
    fn test_sibling_post_link() -> Result<(), ParseError> {
        assert_eq!(
            "<p><a href=\"https://example.org/blog/other\">x</a></p>\n",
            render("[x](other.md)")?
        );
        Ok(())
    }

    #[test]
    fn test_bundle_post_link() -> Result<(), ParseError> {
        assert_eq!(
            "<p><a href=\"https://example.org/blog/other\">x</a></p>\n",
            render("[x](../other/index.md)")?
        );
        Ok(())
    }

    #[test]
    fn test_post_named_like_bundle_index() -> Result<(), ParseError> {
        assert_eq!(
            "<p><a href=\"https://example.org/blog/reindex\">x</a></p>\n",
            render("[x](reindex.md)")?
        );
        Ok(())
    }

    #[test]
    fn test_relative_asset_resolves_against_bundle() -> Result<(), ParseError> {
        assert_eq!(
            "<p><img src=\"https://example.org/blog/hello/cover.jpg\" alt=\"c\" /></p>\n",
            render("![c](cover.jpg)")?
        );
        Ok(())
    }

    #[test]
    fn test_absolute_link_untouched() -> Result<(), ParseError> {
        assert_eq!(
            "<p><a href=\"https://remote.org/notes.md\">x</a></p>\n",
            render("[x](https://remote.org/notes.md)")?
        );
        Ok(())
    }

    #[test]
    fn test_fragment_untouched() -> Result<(), ParseError> {
        assert_eq!("<p><a href=\"#top\">x</a></p>\n", render("[x](#top)")?);
        Ok(())
    }

    #[test]
    fn test_post_slug() {
        assert_eq!(Some(String::from("other")), post_slug("other.md"));
        assert_eq!(Some(String::from("other")), post_slug("./other.md#intro"));
        assert_eq!(Some(String::from("other")), post_slug("other/index.md"));
        assert_eq!(None, post_slug("cover.jpg"));
        assert_eq!(None, post_slug("index.md"));
        assert_eq!(Some(String::from("reindex")), post_slug("reindex.md"));
        assert_eq!(Some(String::from("reindex")), post_slug("../reindex.md"));
    }
}
