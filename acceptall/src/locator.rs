use tracing::debug;

use crate::element::PageElement;
use crate::engine::PageEngine;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A high-level API for finding page elements.
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn PageEngine>,
    selector: Selector,
    timeout: Duration, // Default timeout for this locator instance
    root: Option<PageElement>,
}

impl Locator {
    /// Create a new locator with the given selector
    pub fn new(engine: Arc<dyn PageEngine>, selector: Selector) -> Self {
        Self {
            engine,
            selector,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            root: None,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scope this locator to the subtree of an element.
    pub fn within(mut self, element: PageElement) -> Self {
        self.root = Some(element);
        self
    }

    /// All elements matching this locator right now. Does not wait: an empty
    /// page state is a meaningful answer for the accept loop.
    pub async fn all(&self) -> Result<Vec<PageElement>, AutomationError> {
        self.engine
            .find_elements(&self.selector, self.root.as_ref())
            .await
    }

    /// First matching element, waiting up to the given timeout for one to
    /// appear. Uses the locator's default timeout when `None`.
    pub async fn first(&self, timeout: Option<Duration>) -> Result<PageElement, AutomationError> {
        self.wait(timeout).await
    }

    /// Wait for an element matching the locator to appear.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<PageElement, AutomationError> {
        debug!("Waiting for element matching selector: {:?}", self.selector);
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = tokio::time::Instant::now() + effective_timeout;

        loop {
            if let Some(element) = self
                .engine
                .find_elements(&self.selector, self.root.as_ref())
                .await?
                .into_iter()
                .next()
            {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "Timed out after {effective_timeout:?} waiting for element {:?}",
                    self.selector
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn selector_string(&self) -> String {
        format!("{:?}", self.selector)
    }
}
