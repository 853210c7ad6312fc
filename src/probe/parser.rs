//! HTML inspection for the classifier
//!
//! The classifier only ever asks one question of a page: does it contain at
//! least one element matching a structural descriptor? [`ElementQuery`] is
//! that descriptor, and [`HtmlInspector`] answers the question.

use scraper::{Html, Selector};

/// How an attribute value is compared
///
/// Comparisons are ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    /// Attribute present, any value
    Present,
    /// Attribute value equals the given string
    Equals(String),
    /// Attribute value contains the given substring
    Contains(String),
}

impl AttrMatch {
    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Present => true,
            Self::Equals(expected) => value.trim().eq_ignore_ascii_case(expected),
            Self::Contains(needle) => value
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

/// Constraint on one attribute of the element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeQuery {
    pub name: String,
    pub matcher: AttrMatch,
}

/// Tag name plus an optional attribute constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementQuery {
    pub tag: String,
    pub attribute: Option<AttributeQuery>,
}

impl ElementQuery {
    /// Any element with the given tag
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attribute: None,
        }
    }

    /// Element whose attribute `name` equals `value`
    pub fn with_attr_equals(
        tag: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            attribute: Some(AttributeQuery {
                name: name.into(),
                matcher: AttrMatch::Equals(value.into()),
            }),
        }
    }

    /// Element whose attribute `name` contains `needle`
    pub fn with_attr_containing(
        tag: impl Into<String>,
        name: impl Into<String>,
        needle: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            attribute: Some(AttributeQuery {
                name: name.into(),
                matcher: AttrMatch::Contains(needle.into()),
            }),
        }
    }
}

/// Answers "does this HTML contain a matching element?"
pub trait HtmlInspector: Send + Sync {
    /// True when any of `queries` matches an element of `html`
    ///
    /// Implementations parse `html` once for the whole slice.
    fn contains_any(&self, html: &str, queries: &[ElementQuery]) -> bool;

    fn contains(&self, html: &str, query: &ElementQuery) -> bool {
        self.contains_any(html, std::slice::from_ref(query))
    }
}

/// [`HtmlInspector`] backed by the `scraper` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperInspector;

impl ScraperInspector {
    fn matches(document: &Html, query: &ElementQuery) -> bool {
        // Tag names only; attribute values are checked below so that user
        // supplied tokens never have to survive CSS escaping
        let Ok(selector) = Selector::parse(query.tag.trim()) else {
            tracing::debug!("Invalid tag in element query: {:?}", query.tag);
            return false;
        };

        document.select(&selector).any(|element| match &query.attribute {
            None => true,
            Some(attr) => element
                .value()
                .attr(&attr.name)
                .is_some_and(|value| attr.matcher.matches(value)),
        })
    }
}

impl HtmlInspector for ScraperInspector {
    fn contains_any(&self, html: &str, queries: &[ElementQuery]) -> bool {
        if queries.is_empty() {
            return false;
        }

        let document = Html::parse_document(html);
        queries.iter().any(|query| Self::matches(&document, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(html: &str, query: &ElementQuery) -> bool {
        ScraperInspector.contains(html, query)
    }

    #[test]
    fn test_meta_by_name() {
        let html = r#"<html><head><meta name="shopify-digital-wallet" content="/1/digital_wallets"></head><body></body></html>"#;
        let query = ElementQuery::with_attr_equals("meta", "name", "shopify-digital-wallet");
        assert!(contains(html, &query));

        let other = ElementQuery::with_attr_equals("meta", "name", "generator");
        assert!(!contains(html, &other));
    }

    #[test]
    fn test_script_src_contains() {
        let html = r#"<html><head><script src="https://cdn.Shopify.com/s/files/theme.js"></script></head></html>"#;
        let query = ElementQuery::with_attr_containing("script", "src", "shopify");
        assert!(contains(html, &query));
    }

    #[test]
    fn test_inline_script_has_no_src() {
        let html = r#"<html><head><script>window.Shopify = {};</script></head></html>"#;
        let query = ElementQuery::with_attr_containing("script", "src", "shopify");
        assert!(!contains(html, &query));
    }

    #[test]
    fn test_password_input() {
        let html = r#"<html><body><form><input type="PASSWORD" name="password"></form></body></html>"#;
        let query = ElementQuery::with_attr_equals("input", "type", "password");
        assert!(contains(html, &query));

        let text_only = r#"<html><body><form><input type="text" name="q"></form></body></html>"#;
        assert!(!contains(text_only, &query));
    }

    #[test]
    fn test_attribute_present() {
        let html = r#"<html><body><form data-gate></form></body></html>"#;
        let query = ElementQuery {
            tag: "form".to_string(),
            attribute: Some(AttributeQuery {
                name: "data-gate".to_string(),
                matcher: AttrMatch::Present,
            }),
        };
        assert!(contains(html, &query));
    }

    #[test]
    fn test_bare_tag() {
        assert!(contains("<p>hello</p>", &ElementQuery::tag("p")));
        assert!(!contains("<p>hello</p>", &ElementQuery::tag("table")));
    }

    #[test]
    fn test_contains_any() {
        let html = r#"<html><head><script src="//cdn.shopify.com/s/theme.js"></script></head></html>"#;
        let meta = ElementQuery::with_attr_equals("meta", "name", "shopify-digital-wallet");
        let script = ElementQuery::with_attr_containing("script", "src", "shopify");

        assert!(ScraperInspector.contains_any(html, &[meta.clone(), script]));
        assert!(!ScraperInspector.contains_any(html, &[meta]));
        assert!(!ScraperInspector.contains_any(html, &[]));
    }

    #[test]
    fn test_malformed_html_and_invalid_tag() {
        assert!(!contains("<<<not html", &ElementQuery::tag("meta")));
        assert!(!contains("<p>x</p>", &ElementQuery::tag("[[[")));
        assert!(!contains("", &ElementQuery::tag("meta")));
    }
}
