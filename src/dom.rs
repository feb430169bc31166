//! Element tree for a captured page
//!
//! An arena of elements rooted at `body`. Only what capture needs is kept:
//! tag, attributes, own text, form value and whether a click handler is
//! attached. Pages can be built in code or loaded from a JSON description.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of an element inside its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

const VALUE_TAGS: [&str; 3] = ["input", "textarea", "select"];

#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    value: Option<String>,
    click_handler: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let value = VALUE_TAGS.contains(&tag.as_str()).then(String::new);
        Self {
            tag,
            attrs: Vec::new(),
            text: String::new(),
            value,
            click_handler: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_click_handler(mut self) -> Self {
        self.click_handler = true;
        self
    }

    /// Lowercase tag name
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Raw attribute value, present even when empty
    pub fn attr(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, treating an empty value as missing
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.non_empty_attr("id")
    }

    /// Class names in attribute order
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Own text, not including descendants
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_content_editable(&self) -> bool {
        matches!(
            self.attr("contenteditable").map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("") | Some("true")
        )
    }

    pub fn has_click_handler(&self) -> bool {
        self.click_handler || self.attr("onclick").is_some()
    }

    /// Input type as a form control reports it
    pub fn input_type(&self) -> String {
        match self.tag.as_str() {
            "textarea" => "textarea".to_string(),
            "select" => "select-one".to_string(),
            "button" => match self.attr("type").map(|t| t.to_ascii_lowercase()).as_deref() {
                Some(t @ ("reset" | "button")) => t.to_string(),
                _ => "submit".to_string(),
            },
            _ => self
                .non_empty_attr("type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string()),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A page's element tree, rooted at `body`
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element::new("body")],
        }
    }

    pub fn body(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0)
    }

    /// Append `element` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, mut element: Element) -> Result<NodeId> {
        if self.get(parent).is_none() {
            return Err(Error::page_invalid(format!("no parent element {}", parent.0)));
        }
        let id = NodeId(self.nodes.len());
        element.parent = Some(parent);
        element.children.clear();
        self.nodes.push(element);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|e| e.parent)
    }

    /// `id` and then each ancestor up to and including body
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.get(id).map(|_| id);
        std::iter::successors(start, move |n| self.parent(*n))
    }

    /// Siblings before `id`, nearest first
    pub fn previous_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings: &[NodeId] = self
            .parent(id)
            .and_then(|p| self.get(p))
            .map(|p| p.children.as_slice())
            .unwrap_or(&[]);
        let pos = siblings.iter().position(|s| *s == id).unwrap_or(0);
        siblings[..pos].iter().rev().copied()
    }

    /// 1-based rank of `id` among its same-tag siblings
    pub fn same_tag_position(&self, id: NodeId) -> usize {
        let Some(tag) = self.get(id).map(|e| e.tag.as_str()) else {
            return 1;
        };
        1 + self
            .previous_siblings(id)
            .filter(|s| self.get(*s).map(|e| e.tag.as_str()) == Some(tag))
            .count()
    }

    /// Own text followed by descendants' text, in document order
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(e) = self.get(id) {
            out.push_str(&e.text);
            for child in &e.children {
                self.collect_text(*child, out);
            }
        }
    }

    /// Elements attached under body in document (pre-)order, body first
    pub fn descendants(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self.body()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            if let Some(e) = self.get(id) {
                stack.extend(e.children.iter().rev().copied());
            }
            Some(id)
        })
    }

    /// Replace the value of a form control or the text of an editable element
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        let element = self
            .get_mut(id)
            .ok_or_else(|| Error::page_invalid(format!("no element {}", id.0)))?;
        if element.value.is_some() {
            element.value = Some(value.to_string());
        } else if element.is_content_editable() {
            element.text = value.to_string();
            let children = std::mem::take(&mut element.children);
            for child in children {
                if let Some(c) = self.get_mut(child) {
                    c.parent = None;
                }
            }
        } else {
            return Err(Error::page_invalid(format!(
                "<{}> has neither a value nor editable content",
                element.tag
            )));
        }
        Ok(())
    }

    pub fn from_spec(body: &ElementSpec) -> Result<Self> {
        if !body.tag.eq_ignore_ascii_case("body") {
            return Err(Error::page_invalid(format!(
                "page root must be <body>, got <{}>",
                body.tag
            )));
        }
        let mut doc = Document::new();
        let root = doc.body();
        doc.nodes[0] = body.to_element();
        for child in &body.children {
            doc.append_spec(root, child)?;
        }
        Ok(doc)
    }

    fn append_spec(&mut self, parent: NodeId, spec: &ElementSpec) -> Result<NodeId> {
        let id = self.append(parent, spec.to_element())?;
        for child in &spec.children {
            self.append_spec(id, child)?;
        }
        Ok(id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of an element and its subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub onclick: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// The element alone, without children
    fn to_element(&self) -> Element {
        let mut element = self
            .attrs
            .iter()
            .fold(Element::new(&self.tag), |e, (k, v)| e.with_attr(k, v))
            .with_text(&self.text);
        if let Some(v) = &self.value {
            element = element.with_value(v);
        }
        if self.onclick {
            element = element.with_click_handler();
        }
        element
    }
}

/// A document together with the URL it was loaded from
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub document: Document,
}

#[derive(Deserialize)]
struct PageSpec {
    url: String,
    body: ElementSpec,
}

impl Page {
    pub fn new(url: impl Into<String>, document: Document) -> Self {
        Self {
            url: url.into(),
            document,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let spec: PageSpec = serde_json::from_str(json)?;
        Ok(Self {
            url: spec.url,
            document: Document::from_spec(&spec.body)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let form = doc.append(body, Element::new("FORM")).unwrap();
        let a = doc
            .append(form, Element::new("span").with_text("Hello "))
            .unwrap();
        let b = doc
            .append(form, Element::new("span").with_text("world"))
            .unwrap();
        (doc, form, a, b)
    }

    #[test]
    fn tags_are_lowercased() {
        let (doc, form, _, _) = sample();
        assert_eq!(doc.get(form).unwrap().tag(), "form");
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let (doc, form, _, _) = sample();
        assert_eq!(doc.text_content(form), "Hello world");
    }

    #[test]
    fn same_tag_position_counts_only_matching_tags() {
        let (mut doc, form, a, b) = sample();
        let c = doc.append(form, Element::new("div")).unwrap();
        let d = doc.append(form, Element::new("span")).unwrap();
        assert_eq!(doc.same_tag_position(a), 1);
        assert_eq!(doc.same_tag_position(b), 2);
        assert_eq!(doc.same_tag_position(c), 1);
        assert_eq!(doc.same_tag_position(d), 3);
    }

    #[test]
    fn form_controls_start_with_empty_value() {
        let input = Element::new("input");
        assert_eq!(input.value(), Some(""));
        assert_eq!(input.input_type(), "text");
        assert_eq!(Element::new("div").value(), None);
        assert_eq!(Element::new("textarea").input_type(), "textarea");
        assert_eq!(
            Element::new("input").with_attr("type", "Password").input_type(),
            "password"
        );
    }

    #[test]
    fn set_value_on_editable_replaces_text() {
        let mut doc = Document::new();
        let body = doc.body();
        let editor = doc
            .append(body, Element::new("div").with_attr("contenteditable", "true"))
            .unwrap();
        doc.set_value(editor, "draft").unwrap();
        assert_eq!(doc.text_content(editor), "draft");

        let plain = doc.append(body, Element::new("p")).unwrap();
        assert!(doc.set_value(plain, "x").is_err());
    }

    #[test]
    fn page_from_json() {
        let page = Page::from_json(
            r#"{
                "url": "https://example.com/login",
                "body": {
                    "tag": "body",
                    "children": [
                        {"tag": "input", "attrs": {"id": "email", "type": "email"}},
                        {"tag": "button", "text": "Sign in", "onclick": true}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(page.url, "https://example.com/login");
        let ids: Vec<_> = page.document.descendants().collect();
        assert_eq!(ids.len(), 3);
        let button = page.document.get(ids[2]).unwrap();
        assert!(button.has_click_handler());
        assert_eq!(page.document.get(ids[1]).unwrap().input_type(), "email");
    }

    #[test]
    fn button_type_defaults_to_submit() {
        assert_eq!(Element::new("button").input_type(), "submit");
        assert_eq!(Element::new("button").with_attr("type", "Reset").input_type(), "reset");
        assert_eq!(Element::new("button").with_attr("type", "button").input_type(), "button");
        assert_eq!(Element::new("button").with_attr("type", "bogus").input_type(), "submit");
    }

    #[test]
    fn descendants_skip_detached_children() {
        let mut doc = Document::new();
        let body = doc.body();
        let editor = doc
            .append(body, Element::new("div").with_attr("contenteditable", ""))
            .unwrap();
        let inner = doc.append(editor, Element::new("b").with_text("old")).unwrap();
        let after = doc.append(body, Element::new("p")).unwrap();
        assert_eq!(doc.descendants().collect::<Vec<_>>(), vec![body, editor, inner, after]);

        doc.set_value(editor, "new").unwrap();
        assert_eq!(doc.descendants().collect::<Vec<_>>(), vec![body, editor, after]);
    }

    #[test]
    fn page_json_keeps_value_and_text() {
        let page = Page::from_json(
            r#"{"url": "u", "body": {"tag": "body", "text": "top", "children": [
                {"tag": "input", "value": "prefilled"}
            ]}}"#,
        )
        .unwrap();
        let doc = &page.document;
        assert_eq!(doc.get(doc.body()).unwrap().text(), "top");
        let input = doc.descendants().nth(1).unwrap();
        assert_eq!(doc.get(input).unwrap().value(), Some("prefilled"));
    }

    #[test]
    fn page_root_must_be_body() {
        let err = Page::from_json(r#"{"url": "u", "body": {"tag": "div"}}"#).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::PageInvalid);
    }
}
