//! Invitation-accepting automation for a social network's invitation page.
//!
//! The agent scans the live DOM for enabled "Accept" controls, clicks them
//! sequentially with jittered delays, records each accepted invitation to a
//! local store, scrolls to surface lazy-loaded invitations, and survives a
//! forced page reload through a persisted resume checkpoint. A detached
//! control surface talks to it over the WebSocket bridge.

use std::sync::Arc;

pub mod agent;
pub mod bridge;
pub mod dom;
pub mod element;
pub mod engine;
pub mod errors;
pub mod identity;
pub mod locator;
pub mod mock;
pub mod remote;
pub mod selector;
pub mod storage;
#[cfg(test)]
mod tests;

pub use agent::{AcceptAgent, AgentConfig, AgentEvent, AgentHandle, RunOutcome};
pub use bridge::{Command, ControlBridge, DEFAULT_WS_ADDR};
pub use element::{PageElement, PageElementImpl};
pub use engine::PageEngine;
pub use errors::AutomationError;
pub use locator::Locator;
pub use remote::RemoteEngine;
pub use selector::Selector;
pub use storage::{InvitationEntry, InvitationStore, ResumeSession};

/// The invitation manager page the agent operates on.
pub const INVITATIONS_URL: &str = "https://www.linkedin.com/mynetwork/invitation-manager/";

/// The main entry point for page automation: a thin handle over an engine.
pub struct Page {
    engine: Arc<dyn PageEngine>,
}

impl Page {
    pub fn new(engine: Arc<dyn PageEngine>) -> Self {
        Self { engine }
    }

    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.engine.clone(), selector.into())
    }

    pub fn engine(&self) -> Arc<dyn PageEngine> {
        self.engine.clone()
    }
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}
