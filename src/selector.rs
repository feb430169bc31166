//! Selector generation for recorded targets
//!
//! Rules, first match wins:
//!   #id                          - id attribute
//!   [data-testid="v"]            - test id
//!   tag[aria-label="v"]          - accessible label
//!   tag[title="v"]               - title
//!   tag[role="v"]                - role
//!   tag.c1.c2                    - every class, in order
//!   a > b:nth-child(2) > c       - structural path up to body or an id
//!
//! `:nth-child(N)` here counts same-tag siblings only. The locator reads it
//! back with the same meaning.

use crate::dom::{Document, NodeId};
use serde::{Deserialize, Serialize};

/// Which rule produced a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorStrategy {
    Id,
    TestId,
    AriaLabel,
    Title,
    Role,
    Class,
    Path,
}

impl SelectorStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::TestId => "test-id",
            Self::AriaLabel => "aria-label",
            Self::Title => "title",
            Self::Role => "role",
            Self::Class => "class",
            Self::Path => "path",
        }
    }
}

pub const TEST_ID_ATTR: &str = "data-testid";

/// Selector for `node`, or `None` if it is not in `doc`
pub fn generate_selector(doc: &Document, node: NodeId) -> Option<String> {
    generate_with_strategy(doc, node).map(|(s, _)| s)
}

pub fn generate_with_strategy(doc: &Document, node: NodeId) -> Option<(String, SelectorStrategy)> {
    let element = doc.get(node)?;
    let tag = element.tag();

    if let Some(id) = element.id() {
        return Some((format!("#{}", id), SelectorStrategy::Id));
    }
    if let Some(v) = element.non_empty_attr(TEST_ID_ATTR) {
        return Some((format!("[{}=\"{}\"]", TEST_ID_ATTR, v), SelectorStrategy::TestId));
    }

    let labelled = [
        ("aria-label", SelectorStrategy::AriaLabel),
        ("title", SelectorStrategy::Title),
        ("role", SelectorStrategy::Role),
    ];
    for (attr, strategy) in labelled {
        if let Some(v) = element.non_empty_attr(attr) {
            return Some((format!("{}[{}=\"{}\"]", tag, attr, v), strategy));
        }
    }

    let classes: Vec<&str> = element.classes().collect();
    if !classes.is_empty() {
        return Some((format!("{}.{}", tag, classes.join(".")), SelectorStrategy::Class));
    }

    Some((structural_path(doc, node), SelectorStrategy::Path))
}

fn structural_path(doc: &Document, node: NodeId) -> String {
    let body = doc.body();
    let mut path = Vec::new();

    for current in doc.ancestors(node).take_while(|n| *n != body) {
        let Some(element) = doc.get(current) else {
            break;
        };
        if let Some(id) = element.id() {
            path.push(format!("#{}", id));
            break;
        }
        let nth = doc.same_tag_position(current);
        if nth > 1 {
            path.push(format!("{}:nth-child({})", element.tag(), nth));
        } else {
            path.push(element.tag().to_string());
        }
    }

    path.reverse();
    path.join(" > ")
}
