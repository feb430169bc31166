//! Locator - resolve generated selectors against a document
//!
//! Understands exactly the dialect `selector` emits:
//!   #id
//!   [data-testid="v"]
//!   tag[attr="v"]
//!   tag.c1.c2
//!   tag:nth-child(N)         - N-th sibling with the same tag
//!   a > b > c                - child combinator chain
//!
//! The first segment of a chain may match at any depth.

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::selector::generate_selector;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Locator {
    source: String,
    segments: Vec<Segment>,
}

impl Locator {
    pub fn parse(selector: &str) -> Result<Self> {
        let s = selector.trim();
        if s.is_empty() {
            return Err(Error::selector_invalid(s, "empty selector"));
        }

        let mut segments = Vec::new();
        for part in split_chain(s) {
            segments.push(Segment::parse(part.trim(), s)?);
        }

        Ok(Self {
            source: s.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn find(&self, doc: &Document) -> Result<NodeId> {
        let matches = self.find_all(doc);
        debug!(selector = %self.source, matches = matches.len(), "locate");

        match matches.as_slice() {
            [] => Err(Error::element_not_found(&self.source)),
            [one] => Ok(*one),
            many => Err(Error::multiple_matches(&self.source, many.len())
                .with_suggestions(vec![
                    "Give the element an id or data-testid".to_string(),
                    "Anchor the path at an ancestor with an id".to_string(),
                ])
                .with_context(serde_json::json!({
                    "matches": many
                        .iter()
                        .map(|n| generate_selector(doc, *n))
                        .collect::<Vec<_>>()
                }))),
        }
    }

    pub fn find_all(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants()
            .filter(|n| self.matches(doc, *n))
            .collect()
    }

    pub fn exists(&self, doc: &Document) -> bool {
        !self.find_all(doc).is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let mut current = Some(node);
        for segment in self.segments.iter().rev() {
            match current {
                Some(n) if segment.matches(doc, n) => current = doc.parent(n),
                _ => return false,
            }
        }
        true
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Split on ` > ` outside quoted attribute values
fn split_chain(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b' ' if !in_quotes && s[i..].starts_with(" > ") => {
                parts.push(&s[start..i]);
                i += 3;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&s[start..]);
    parts
}

impl Segment {
    fn parse(part: &str, whole: &str) -> Result<Self> {
        if part.is_empty() {
            return Err(Error::selector_invalid(whole, "empty segment"));
        }

        if let Some(id) = part.strip_prefix('#') {
            if id.is_empty() {
                return Err(Error::selector_invalid(whole, "'#' without an id"));
            }
            return Ok(Self {
                id: Some(id.to_string()),
                ..Default::default()
            });
        }

        let mut seg = Segment::default();
        let tag_end = part.find(['[', '.', ':']).unwrap_or(part.len());
        if tag_end > 0 {
            seg.tag = Some(part[..tag_end].to_ascii_lowercase());
        }

        let mut rest = &part[tag_end..];
        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('[') {
                let (name, tail) = inner
                    .split_once("=\"")
                    .ok_or_else(|| Error::selector_invalid(whole, "expected [attr=\"value\"]"))?;
                let (value, tail) = tail
                    .split_once("\"]")
                    .ok_or_else(|| Error::selector_invalid(whole, "unterminated attribute value"))?;
                seg.attr = Some((name.to_ascii_lowercase(), value.to_string()));
                rest = tail;
            } else if let Some(inner) = rest.strip_prefix('.') {
                let end = inner.find(['[', '.', ':']).unwrap_or(inner.len());
                if end == 0 {
                    return Err(Error::selector_invalid(whole, "'.' without a class"));
                }
                seg.classes.push(inner[..end].to_string());
                rest = &inner[end..];
            } else if let Some(inner) = rest.strip_prefix(":nth-child(") {
                let (n, tail) = inner
                    .split_once(')')
                    .ok_or_else(|| Error::selector_invalid(whole, "unterminated :nth-child"))?;
                let n: usize = n
                    .trim()
                    .parse()
                    .map_err(|_| Error::selector_invalid(whole, &format!("bad index '{}'", n)))?;
                if n == 0 {
                    return Err(Error::selector_invalid(whole, ":nth-child is 1-based"));
                }
                seg.nth = Some(n);
                rest = tail;
            } else {
                return Err(Error::selector_invalid(
                    whole,
                    &format!("unexpected '{}'", rest),
                ));
            }
        }

        Ok(seg)
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = doc.get(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if element.tag() != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some((name, value)) = &self.attr {
            if element.attr(name) != Some(value.as_str()) {
                return false;
            }
        }
        if !self
            .classes
            .iter()
            .all(|c| element.classes().any(|have| have == c))
        {
            return false;
        }
        match self.nth {
            Some(n) => doc.same_tag_position(node) == n,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use crate::error::ErrorCode;
    use crate::selector::generate_selector;

    fn list_page() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let nav = doc.append(body, Element::new("nav").with_attr("id", "menu")).unwrap();
        let ul = doc.append(nav, Element::new("ul")).unwrap();
        let items = (0..3)
            .map(|i| {
                doc.append(ul, Element::new("li").with_text(&format!("item {}", i)))
                    .unwrap()
            })
            .collect();
        (doc, items)
    }

    #[test]
    fn parse_compound_segment() {
        let loc = Locator::parse(r#"button.btn.primary[aria-label="Save > close"]:nth-child(2)"#).unwrap();
        assert_eq!(loc.segments().len(), 1);
        let seg = &loc.segments()[0];
        assert_eq!(seg.tag.as_deref(), Some("button"));
        assert_eq!(seg.classes, vec!["btn", "primary"]);
        assert_eq!(seg.attr, Some(("aria-label".to_string(), "Save > close".to_string())));
        assert_eq!(seg.nth, Some(2));
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "#", "div[", "li:nth-child(0)", "li:hover", "a..b"] {
            let err = Locator::parse(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::SelectorInvalid, "{}", bad);
        }
    }

    #[test]
    fn generated_paths_resolve_back() {
        let (doc, items) = list_page();
        for item in &items[1..] {
            let selector = generate_selector(&doc, *item).unwrap();
            let loc = Locator::parse(&selector).unwrap();
            assert_eq!(loc.find(&doc).unwrap(), *item, "{}", selector);
        }
    }

    #[test]
    fn first_sibling_path_is_not_unique() {
        // rank 1 carries no suffix, so it also matches later siblings
        let (doc, items) = list_page();
        let selector = generate_selector(&doc, items[0]).unwrap();
        assert_eq!(selector, "#menu > ul > li");
        assert_eq!(Locator::parse(&selector).unwrap().find_all(&doc), items);
    }

    #[test]
    fn ambiguous_selector_reports_matches() {
        let (doc, _) = list_page();
        let err = Locator::parse("ul > li").unwrap().find(&doc).unwrap_err();
        assert_eq!(err.code, ErrorCode::MultipleMatches);
        assert!(!err.suggestions.is_empty());
        let matches = err.context.unwrap()["matches"].as_array().unwrap().len();
        assert_eq!(matches, 3);
    }

    #[test]
    fn missing_element() {
        let (doc, _) = list_page();
        let loc = Locator::parse("#nope").unwrap();
        assert!(!loc.exists(&doc));
        assert_eq!(loc.find(&doc).unwrap_err().code, ErrorCode::ElementNotFound);
    }

    #[test]
    fn test_id_selector_matches_any_tag() {
        let mut doc = Document::new();
        let body = doc.body();
        let n = doc
            .append(body, Element::new("section").with_attr("data-testid", "hero"))
            .unwrap();
        assert_eq!(Locator::parse(r#"[data-testid="hero"]"#).unwrap().find(&doc).unwrap(), n);
    }
}
