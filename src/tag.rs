//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag.

use gtmpl::Value;
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`crate::post::Post`] tag. Tags are slugified on parse so
/// `Web Dev` and `web-dev` resolve to the same tag and the same tag listing.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The slugified tag name. Safe to drop into a [`Url`] path segment.
    pub name: String,

    /// The URL for the tag's first listing page, i.e.
    /// `{tags_url}/{name}/`.
    pub url: Url,
}

impl Tag {
    /// Builds a [`Tag`] from a raw front matter value. The URL must end in a
    /// trailing slash; otherwise [`Url::join`] treats the tag name as a file
    /// name and drops it when joining relative paths later.
    pub fn new(raw: &str, tags_url: &Url) -> Result<Tag, url::ParseError> {
        let name = slug::slugify(raw);
        let url = tags_url.join(&format!("{}/", name))?;
        Ok(Tag { name, url })
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        use std::collections::HashMap;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("tag".to_owned(), (&t.name).into());
        m.insert("url".to_owned(), Value::String(t.url.to_string()));
        Value::Object(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_slugifies_name() -> Result<(), url::ParseError> {
        let tags_url = Url::parse("https://example.org/tags/")?;
        let tag = Tag::new("Web Dev", &tags_url)?;
        assert_eq!("web-dev", tag.name);
        assert_eq!("https://example.org/tags/web-dev/", tag.url.as_str());
        Ok(())
    }

    #[test]
    fn test_equality_ignores_url() -> Result<(), url::ParseError> {
        let a = Tag::new("rust", &Url::parse("https://a.example/tags/")?)?;
        let b = Tag::new("Rust", &Url::parse("https://b.example/tags/")?)?;
        assert_eq!(a, b);
        Ok(())
    }
}
