//! actiontrace-core - element model and selectors for browser action traces
//!
//! Pure, host-independent primitives. The recorder crate builds on these.
//!
//! ## Modules
//!
//! - **dom**: arena-backed element tree, buildable from a JSON page description
//! - **selector**: stable CSS-like locator for an element
//! - **locator**: re-query a generated selector against a document
//! - **error**: structured errors for tooling

pub mod dom;
pub mod error;
pub mod locator;
pub mod selector;

pub use dom::{Document, Element, ElementSpec, NodeId, Page};
pub use error::{Error, ErrorCode, Result};
pub use locator::Locator;
pub use selector::{generate_selector, generate_with_strategy, SelectorStrategy};

pub mod prelude {
    pub use crate::dom::{Document, Element, ElementSpec, NodeId, Page};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::locator::Locator;
    pub use crate::selector::{generate_selector, generate_with_strategy, SelectorStrategy};
}
