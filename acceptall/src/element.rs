use crate::errors::AutomationError;
use std::collections::HashMap;
use std::fmt::Debug;

/// Represents a DOM element on the live (or mocked) page.
#[derive(Debug)]
pub struct PageElement {
    inner: Box<dyn PageElementImpl>,
}

/// Interface for engine-specific element implementations.
///
/// Structure reads (tag, text, attributes, parent, children) are synchronous
/// against the element's snapshot; only the actions that touch the live page
/// are async.
#[async_trait::async_trait]
pub trait PageElementImpl: Send + Sync + Debug {
    /// Stable identity of the element within its page, used for equality.
    fn object_id(&self) -> usize;
    fn tag(&self) -> String;
    /// Visible text of the element including descendants, whitespace-joined.
    fn text(&self) -> String;
    fn attribute(&self, name: &str) -> Option<String>;
    fn attributes(&self) -> HashMap<String, String>;
    fn parent(&self) -> Result<Option<PageElement>, AutomationError>;
    fn children(&self) -> Result<Vec<PageElement>, AutomationError>;
    fn is_enabled(&self) -> Result<bool, AutomationError>;
    async fn click(&self) -> Result<(), AutomationError>;
    async fn scroll_into_view(&self) -> Result<(), AutomationError>;
    fn clone_box(&self) -> Box<dyn PageElementImpl>;
}

impl PageElement {
    /// Create a new element from an engine-specific implementation.
    pub fn new(impl_: Box<dyn PageElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn tag(&self) -> String {
        self.inner.tag()
    }

    pub fn text(&self) -> String {
        self.inner.text()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attribute(name)
    }

    pub fn attributes(&self) -> HashMap<String, String> {
        self.inner.attributes()
    }

    pub fn parent(&self) -> Result<Option<PageElement>, AutomationError> {
        self.inner.parent()
    }

    pub fn children(&self) -> Result<Vec<PageElement>, AutomationError> {
        self.inner.children()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled()
    }

    /// Click the element on the live page.
    pub async fn click(&self) -> Result<(), AutomationError> {
        self.inner.click().await
    }

    /// Scroll the element into the viewport.
    pub async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.inner.scroll_into_view().await
    }

    /// Class attribute split on whitespace, empty when absent.
    pub fn class_list(&self) -> Vec<String> {
        self.attribute("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl PartialEq for PageElement {
    fn eq(&self, other: &Self) -> bool {
        self.inner.object_id() == other.inner.object_id()
    }
}

impl Eq for PageElement {}

impl std::hash::Hash for PageElement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.object_id().hash(state);
    }
}

impl Clone for PageElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}
