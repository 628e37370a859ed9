//! Test suite for the automation core. Everything runs against the mock
//! engine and snapshot trees; no live page required.

mod identity_tests;
mod selector_tests;
mod storage_tests;

use crate::agent::AgentConfig;
use crate::dom::{DomSnapshot, NodeData, NodeId};
use std::time::Duration;

pub struct PageFixture {
    pub snapshot: DomSnapshot,
    pub buttons: Vec<NodeId>,
}

/// Build an invitation-manager page with one card per name: a list entry
/// holding a profile link, a bolded name node and an enabled Accept button
/// with the site's accessible label.
pub fn invitation_page(names: &[&str]) -> PageFixture {
    let mut snapshot = DomSnapshot::new();
    let body = snapshot.add_node(None, NodeData::new("body"));
    let list = snapshot.add_node(
        Some(body),
        NodeData::new("ul").with_attr("class", "invitation-list"),
    );
    let mut buttons = Vec::new();
    for name in names {
        let slug = name.to_lowercase().replace(' ', "-");
        let card = snapshot.add_node(
            Some(list),
            NodeData::new("li").with_attr("class", "invitation-card"),
        );
        let details = snapshot.add_node(
            Some(card),
            NodeData::new("div").with_attr("class", "invitation-card__details"),
        );
        let link = snapshot.add_node(
            Some(details),
            NodeData::new("a").with_attr("href", format!("/in/{slug}/")),
        );
        snapshot.add_node(
            Some(link),
            NodeData::new("strong")
                .with_attr("class", "invitation-card__name")
                .with_text(*name),
        );
        let button = snapshot.add_node(
            Some(card),
            NodeData::new("button")
                .with_attr("aria-label", format!("Accept {name}'s invitation to connect"))
                .with_text("Accept"),
        );
        buttons.push(button);
    }
    PageFixture { snapshot, buttons }
}

/// Loop config with every delay collapsed so tests run instantly.
pub fn fast_config() -> AgentConfig {
    AgentConfig {
        click_settle: Duration::ZERO,
        click_delay_min: Duration::ZERO,
        click_delay_jitter: Duration::ZERO,
        scroll_settle: Duration::ZERO,
        batch_pause: Duration::ZERO,
        empty_retry_wait: Duration::ZERO,
        resume_settle: Duration::ZERO,
        ..AgentConfig::default()
    }
}
