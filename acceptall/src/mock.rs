//! In-memory page engine used by the test suite.
//!
//! Backs the same `PageEngine`/`PageElementImpl` seams as the remote engine,
//! but runs against a `DomSnapshot` with scripted scroll behavior: each
//! `scroll_to_bottom` pops the next `ScrollStep`, which may grow the page
//! height and reveal previously hidden nodes (lazy-loaded invitations).
//! Clicked controls disappear from subsequent queries, the way the site
//! removes an invitation card once it is accepted.

use crate::dom::{DomSnapshot, NodeId};
use crate::element::{PageElement, PageElementImpl};
use crate::engine::PageEngine;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// One scripted response to a scroll-to-bottom.
#[derive(Debug, Clone, Default)]
pub struct ScrollStep {
    pub height: f64,
    pub reveal: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct MockState {
    clicked: Vec<NodeId>,
    removed: HashSet<NodeId>,
    hidden: HashSet<NodeId>,
    scroll_height: f64,
    scroll_steps: VecDeque<ScrollStep>,
    scroll_count: usize,
    reloaded: bool,
}

/// Scriptable in-memory page.
#[derive(Clone)]
pub struct MockPage {
    snapshot: Arc<DomSnapshot>,
    state: Arc<Mutex<MockState>>,
}

impl MockPage {
    pub fn new(snapshot: DomSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            state: Arc::new(Mutex::new(MockState {
                scroll_height: 1000.0,
                ..Default::default()
            })),
        }
    }

    pub fn set_scroll_height(&self, height: f64) {
        self.state.lock().unwrap().scroll_height = height;
    }

    /// Queue the behavior of the next scroll-to-bottom.
    pub fn push_scroll_step(&self, step: ScrollStep) {
        self.state.lock().unwrap().scroll_steps.push_back(step);
    }

    /// Hide nodes until a scroll step reveals them.
    pub fn hide(&self, ids: impl IntoIterator<Item = NodeId>) {
        let mut state = self.state.lock().unwrap();
        state.hidden.extend(ids);
    }

    /// Node ids clicked so far, in click order.
    pub fn clicks(&self) -> Vec<NodeId> {
        self.state.lock().unwrap().clicked.clone()
    }

    pub fn was_reloaded(&self) -> bool {
        self.state.lock().unwrap().reloaded
    }

    /// How many scroll-to-bottoms have happened.
    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scroll_count
    }

    /// Wrap a snapshot node as a live element of this page.
    pub fn element(&self, id: NodeId) -> PageElement {
        PageElement::new(Box::new(MockElement {
            snapshot: self.snapshot.clone(),
            state: self.state.clone(),
            id,
        }))
    }

    fn visible(&self, id: NodeId) -> bool {
        let state = self.state.lock().unwrap();
        !state.hidden.contains(&id) && !state.removed.contains(&id)
    }
}

#[async_trait::async_trait]
impl PageEngine for MockPage {
    async fn find_elements(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<Vec<PageElement>, AutomationError> {
        let candidate_ids: Vec<NodeId> = match root {
            Some(root) => {
                // Scoped search needs the root to be one of ours.
                let root_id = root
                    .attribute("data-mock-id")
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| {
                        AutomationError::InvalidArgument(
                            "root element does not belong to this mock page".into(),
                        )
                    })?;
                self.snapshot.descendants(root_id)
            }
            None => self.snapshot.ids().collect(),
        };

        let mut matches = Vec::new();
        for id in candidate_ids {
            if !self.visible(id) {
                continue;
            }
            let element = self.element(id);
            if selector.matches(&element) {
                matches.push(element);
            }
        }
        Ok(matches)
    }

    async fn scroll_height(&self) -> Result<f64, AutomationError> {
        Ok(self.state.lock().unwrap().scroll_height)
    }

    async fn scroll_to_bottom(&self) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        state.scroll_count += 1;
        if let Some(step) = state.scroll_steps.pop_front() {
            state.scroll_height = step.height;
            for id in step.reveal {
                state.hidden.remove(&id);
            }
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), AutomationError> {
        self.state.lock().unwrap().reloaded = true;
        Ok(())
    }
}

struct MockElement {
    snapshot: Arc<DomSnapshot>,
    state: Arc<Mutex<MockState>>,
    id: NodeId,
}

impl std::fmt::Debug for MockElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockElement")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .finish()
    }
}

#[async_trait::async_trait]
impl PageElementImpl for MockElement {
    fn object_id(&self) -> usize {
        self.id
    }

    fn tag(&self) -> String {
        self.snapshot
            .node(self.id)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    fn text(&self) -> String {
        self.snapshot.text_content(self.id)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        if name == "data-mock-id" {
            return Some(self.id.to_string());
        }
        self.snapshot.attribute(self.id, name)
    }

    fn attributes(&self) -> HashMap<String, String> {
        self.snapshot
            .node(self.id)
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    fn parent(&self) -> Result<Option<PageElement>, AutomationError> {
        Ok(self.snapshot.parent(self.id).map(|p| self.wrap(p)))
    }

    fn children(&self) -> Result<Vec<PageElement>, AutomationError> {
        Ok(self
            .snapshot
            .children(self.id)
            .iter()
            .map(|&c| self.wrap(c))
            .collect())
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.snapshot.node(self.id).map(|n| !n.disabled).unwrap_or(false))
    }

    async fn click(&self) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        if state.removed.contains(&self.id) {
            return Err(AutomationError::ElementDetached(format!(
                "node {} was already clicked away",
                self.id
            )));
        }
        state.clicked.push(self.id);
        state.removed.insert(self.id);
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn PageElementImpl> {
        Box::new(MockElement {
            snapshot: self.snapshot.clone(),
            state: self.state.clone(),
            id: self.id,
        })
    }
}

impl MockElement {
    fn wrap(&self, id: NodeId) -> PageElement {
        PageElement::new(Box::new(MockElement {
            snapshot: self.snapshot.clone(),
            state: self.state.clone(),
            id,
        }))
    }
}
