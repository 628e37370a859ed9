//! Page engine backed by the bridge's in-page helper.
//!
//! Element discovery runs one script in the live tab: it marks every
//! matching control with a `data-acceptall-id` attribute and ships back a
//! bounded snapshot of the control's ancestor context. Identity extraction
//! then runs in Rust over the same `DomSnapshot` type the mock engine uses.
//! Actions (click, scroll into view) address the control by its mark.

use crate::bridge::ControlBridge;
use crate::dom::{DomSnapshot, NodeData, NodeId};
use crate::element::{PageElement, PageElementImpl};
use crate::engine::PageEngine;
use crate::errors::AutomationError;
use crate::selector::Selector;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on nodes per shipped snapshot, substituted into the scan
/// script as its MAX_NODES. Doubles as the stride for element identity,
/// which stays collision-free because node indices never reach it.
const MAX_SNAPSHOT_NODES: usize = 512;

const HEIGHT_SCRIPT: &str =
    "Math.max(document.body.scrollHeight, document.documentElement.scrollHeight)";

const SCROLL_BOTTOM_SCRIPT: &str = "(() => {\n  const h = Math.max(document.body.scrollHeight, document.documentElement.scrollHeight);\n  window.scrollTo(0, h);\n  return true;\n})()";

const RELOAD_SCRIPT: &str = "location.reload()";

/// Scan template; the `__*__` markers are substituted before eval.
const SCAN_SCRIPT: &str = r#"(() => {
  const MARK = 'data-acceptall-id';
  const MAX_ANCESTORS = 6;
  const MAX_NODES = __MAX_NODES__;
  const wantTag = __TAG__;
  const wantText = __TEXT__;
  const wantClass = __CLASS__;
  const requireEnabled = __ENABLED__;
  let nextHandle = window.__acceptallNextHandle || 1;
  const candidates = Array.from(document.querySelectorAll(wantTag || '*'));
  const out = [];
  for (const el of candidates) {
    if (wantText !== null && (el.textContent || '').trim().toLowerCase() !== wantText) continue;
    if (wantClass !== null && !String(el.className || '').includes(wantClass)) continue;
    if (requireEnabled && el.disabled) continue;
    let handle = el.getAttribute(MARK);
    if (!handle) {
      handle = String(nextHandle++);
      el.setAttribute(MARK, handle);
    }
    let root = el;
    for (let i = 0; i < MAX_ANCESTORS && root.parentElement; i++) root = root.parentElement;
    const nodes = [];
    let controlIndex = 0;
    const visit = (node, parent) => {
      if (nodes.length >= MAX_NODES) return null;
      const id = nodes.length;
      const attributes = {};
      for (const a of node.attributes) attributes[a.name] = a.value;
      const data = {
        tag: node.tagName.toLowerCase(),
        attributes,
        parent,
        children: [],
        disabled: !!node.disabled,
      };
      const own = Array.from(node.childNodes)
        .filter((n) => n.nodeType === Node.TEXT_NODE)
        .map((n) => n.textContent.trim())
        .filter(Boolean)
        .join(' ');
      if (own) data.text = own;
      nodes.push(data);
      if (node === el) controlIndex = id;
      for (const child of node.children) {
        const childId = visit(child, id);
        if (childId !== null) data.children.push(childId);
      }
      return id;
    };
    visit(root, null);
    out.push({ handle: Number(handle), control: controlIndex, nodes });
  }
  window.__acceptallNextHandle = nextHandle;
  return out;
})()"#;

#[derive(Debug, Deserialize)]
struct ScanResult {
    handle: u64,
    control: NodeId,
    nodes: Vec<NodeData>,
}

/// `PageEngine` over a live browser tab.
pub struct RemoteEngine {
    bridge: Arc<ControlBridge>,
    eval_timeout: Duration,
}

impl RemoteEngine {
    pub fn new(bridge: Arc<ControlBridge>) -> Self {
        Self {
            bridge,
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
        }
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    pub(crate) fn scan_script(selector: &Selector) -> Result<String, AutomationError> {
        let mut tag: Option<String> = None;
        let mut text: Option<String> = None;
        let mut class: Option<String> = None;
        let mut enabled = false;

        let atoms: Vec<&Selector> = match selector {
            Selector::Chain(parts) => parts.iter().collect(),
            other => vec![other],
        };
        for atom in atoms {
            match atom {
                Selector::Tag(t) => tag = Some(t.to_lowercase()),
                Selector::Text(t) => text = Some(t.trim().to_lowercase()),
                Selector::ClassFragment(c) => class = Some(c.clone()),
                Selector::Enabled(state) => enabled = *state,
                other => {
                    return Err(AutomationError::UnsupportedOperation(format!(
                        "remote engine cannot evaluate selector atom {other}"
                    )))
                }
            }
        }

        let json_or_null = |v: &Option<String>| match v {
            Some(s) => serde_json::to_string(s).unwrap_or_else(|_| "null".into()),
            None => "null".into(),
        };
        Ok(SCAN_SCRIPT
            .replace("__MAX_NODES__", &MAX_SNAPSHOT_NODES.to_string())
            .replace("__TAG__", &json_or_null(&tag))
            .replace("__TEXT__", &json_or_null(&text))
            .replace("__CLASS__", &json_or_null(&class))
            .replace("__ENABLED__", if enabled { "true" } else { "false" }))
    }
}

#[async_trait::async_trait]
impl PageEngine for RemoteEngine {
    async fn find_elements(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<Vec<PageElement>, AutomationError> {
        if root.is_some() {
            return Err(AutomationError::UnsupportedOperation(
                "remote engine searches the whole document".into(),
            ));
        }
        let script = Self::scan_script(selector)?;
        let Some(value) = self.bridge.eval(&script, self.eval_timeout).await? else {
            // No page helper connected: nothing there to act on.
            debug!("scan skipped, page unreachable");
            return Ok(Vec::new());
        };
        let results: Vec<ScanResult> = serde_json::from_value(value)
            .map_err(|e| AutomationError::BridgeError(format!("scan result: {e}")))?;

        let mut elements = Vec::new();
        for result in results {
            let snapshot = Arc::new(DomSnapshot::from_nodes(result.nodes));
            if snapshot.node(result.control).is_none() {
                warn!(handle = result.handle, "scan result without control node");
                continue;
            }
            elements.push(PageElement::new(Box::new(RemoteElement {
                bridge: self.bridge.clone(),
                eval_timeout: self.eval_timeout,
                snapshot,
                node: result.control,
                handle: result.handle,
            })));
        }
        Ok(elements)
    }

    async fn scroll_height(&self) -> Result<f64, AutomationError> {
        let value = self.bridge.eval(HEIGHT_SCRIPT, self.eval_timeout).await?;
        Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
    }

    async fn scroll_to_bottom(&self) -> Result<(), AutomationError> {
        self.bridge
            .eval(SCROLL_BOTTOM_SCRIPT, self.eval_timeout)
            .await?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), AutomationError> {
        // The document dies under this eval, so the result may never come
        // back; a short timeout and a missing answer both mean it worked.
        let _ = self.bridge.eval(RELOAD_SCRIPT, Duration::from_secs(1)).await;
        Ok(())
    }
}

struct RemoteElement {
    bridge: Arc<ControlBridge>,
    eval_timeout: Duration,
    snapshot: Arc<DomSnapshot>,
    node: NodeId,
    /// The control's `data-acceptall-id` mark. Wrapped ancestors and
    /// descendants share the control's handle; actions always address the
    /// marked control.
    handle: u64,
}

impl std::fmt::Debug for RemoteElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteElement")
            .field("handle", &self.handle)
            .field("node", &self.node)
            .field("tag", &self.tag())
            .finish()
    }
}

impl RemoteElement {
    fn wrap(&self, node: NodeId) -> PageElement {
        PageElement::new(Box::new(RemoteElement {
            bridge: self.bridge.clone(),
            eval_timeout: self.eval_timeout,
            snapshot: self.snapshot.clone(),
            node,
            handle: self.handle,
        }))
    }

    async fn act(&self, call: &str) -> Result<(), AutomationError> {
        let script = format!(
            "(() => {{\n  const el = document.querySelector('[data-acceptall-id=\"{}\"]');\n  if (!el) return false;\n  {call};\n  return true;\n}})()",
            self.handle
        );
        match self.bridge.eval(&script, self.eval_timeout).await? {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            Some(_) => Err(AutomationError::ElementDetached(format!(
                "control {} is no longer on the page",
                self.handle
            ))),
            None => Err(AutomationError::BridgeError(
                "page unreachable during action".into(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl PageElementImpl for RemoteElement {
    fn object_id(&self) -> usize {
        self.handle as usize * MAX_SNAPSHOT_NODES + self.node
    }

    fn tag(&self) -> String {
        self.snapshot
            .node(self.node)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    fn text(&self) -> String {
        self.snapshot.text_content(self.node)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.snapshot.attribute(self.node, name)
    }

    fn attributes(&self) -> HashMap<String, String> {
        self.snapshot
            .node(self.node)
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    fn parent(&self) -> Result<Option<PageElement>, AutomationError> {
        Ok(self.snapshot.parent(self.node).map(|p| self.wrap(p)))
    }

    fn children(&self) -> Result<Vec<PageElement>, AutomationError> {
        Ok(self
            .snapshot
            .children(self.node)
            .iter()
            .map(|&c| self.wrap(c))
            .collect())
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self
            .snapshot
            .node(self.node)
            .map(|n| !n.disabled)
            .unwrap_or(false))
    }

    async fn click(&self) -> Result<(), AutomationError> {
        self.act("el.click()").await
    }

    async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.act("el.scrollIntoView({ block: 'center' })").await
    }

    fn clone_box(&self) -> Box<dyn PageElementImpl> {
        Box::new(RemoteElement {
            bridge: self.bridge.clone(),
            eval_timeout: self.eval_timeout,
            snapshot: self.snapshot.clone(),
            node: self.node,
            handle: self.handle,
        })
    }
}
