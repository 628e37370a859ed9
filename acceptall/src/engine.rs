use crate::element::PageElement;
use crate::errors::AutomationError;
use crate::selector::Selector;

/// The common trait every page backend implements.
///
/// The remote engine drives a live browser tab through the bridge; the mock
/// engine runs against an in-memory snapshot for tests.
#[async_trait::async_trait]
pub trait PageEngine: Send + Sync {
    /// Find all elements matching a selector, optionally scoped to the
    /// subtree of `root`. Returns an empty vec when nothing matches; an
    /// empty result is meaningful to callers and is not an error.
    async fn find_elements(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<Vec<PageElement>, AutomationError>;

    /// Find the first element matching a selector.
    async fn find_element(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<PageElement, AutomationError> {
        self.find_elements(selector, root)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::ElementNotFound(format!("{selector}")))
    }

    /// Combined scroll height of the document, the larger of the body and
    /// root element heights.
    async fn scroll_height(&self) -> Result<f64, AutomationError>;

    /// Scroll the window to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), AutomationError>;

    /// Force a full page reload. On a live page this abruptly terminates the
    /// current document; anything that must survive it has to be persisted
    /// before calling this.
    async fn reload(&self) -> Result<(), AutomationError>;
}
