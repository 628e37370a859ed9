//! Extraction-strategy ordering and fallbacks against snapshot trees.

use super::invitation_page;
use crate::dom::{DomSnapshot, NodeData, NodeId};
use crate::identity::{invitee_name, profile_url, UNKNOWN_NAME};
use crate::mock::MockPage;

fn page_with(snapshot: DomSnapshot) -> MockPage {
    MockPage::new(snapshot)
}

#[test]
fn accessible_label_takes_precedence_over_structure() {
    // The card's structural name disagrees with the label on purpose.
    let mut snapshot = DomSnapshot::new();
    let card = snapshot.add_node(
        None,
        NodeData::new("li").with_attr("class", "invitation-card"),
    );
    snapshot.add_node(
        Some(card),
        NodeData::new("strong")
            .with_attr("class", "invitation-card__name")
            .with_text("Wrong Person"),
    );
    let button = snapshot.add_node(
        Some(card),
        NodeData::new("button")
            .with_attr("aria-label", "Accept Ada Lovelace's invitation to connect")
            .with_text("Accept"),
    );
    let page = page_with(snapshot);
    assert_eq!(invitee_name(&page.element(button)), "Ada Lovelace");
}

#[test]
fn label_possessive_handles_typographic_apostrophe() {
    let mut snapshot = DomSnapshot::new();
    let button = snapshot.add_node(
        None,
        NodeData::new("button")
            .with_attr(
                "aria-label",
                "Accept Jos\u{e9} \u{c1}lvarez\u{2019}s invitation to connect",
            )
            .with_text("Accept"),
    );
    let page = page_with(snapshot);
    assert_eq!(
        invitee_name(&page.element(button)),
        "Jos\u{e9} \u{c1}lvarez"
    );
}

#[test]
fn falls_back_to_known_class_fragment() {
    let mut snapshot = DomSnapshot::new();
    let card = snapshot.add_node(
        None,
        NodeData::new("li").with_attr("class", "invitation-card"),
    );
    snapshot.add_node(
        Some(card),
        NodeData::new("span")
            .with_attr("class", "member-name t-bold")
            .with_text("Grace Hopper"),
    );
    let button = snapshot.add_node(Some(card), NodeData::new("button").with_text("Accept"));
    let page = page_with(snapshot);
    assert_eq!(invitee_name(&page.element(button)), "Grace Hopper");
}

#[test]
fn falls_back_to_bolded_text() {
    let mut snapshot = DomSnapshot::new();
    let card = snapshot.add_node(
        None,
        NodeData::new("li").with_attr("class", "artdeco-card"),
    );
    let para = snapshot.add_node(Some(card), NodeData::new("p"));
    snapshot.add_node(Some(para), NodeData::new("strong").with_text("Alan Turing"));
    let button = snapshot.add_node(Some(card), NodeData::new("button").with_text("Accept"));
    let page = page_with(snapshot);
    assert_eq!(invitee_name(&page.element(button)), "Alan Turing");
}

#[test]
fn falls_back_to_profile_link_text() {
    let mut snapshot = DomSnapshot::new();
    let card = snapshot.add_node(
        None,
        NodeData::new("li").with_attr("class", "artdeco-card"),
    );
    snapshot.add_node(
        Some(card),
        NodeData::new("a")
            .with_attr("href", "/in/katherine-johnson/")
            .with_text("Katherine Johnson"),
    );
    let button = snapshot.add_node(Some(card), NodeData::new("button").with_text("Accept"));
    let page = page_with(snapshot);
    assert_eq!(invitee_name(&page.element(button)), "Katherine Johnson");
}

#[test]
fn unknown_when_no_strategy_applies() {
    let mut snapshot = DomSnapshot::new();
    let div = snapshot.add_node(None, NodeData::new("div"));
    let button = snapshot.add_node(Some(div), NodeData::new("button").with_text("Accept"));
    let page = page_with(snapshot);
    assert_eq!(invitee_name(&page.element(button)), UNKNOWN_NAME);
}

#[test]
fn fixture_card_resolves_name_and_absolute_profile_url() {
    let fixture = invitation_page(&["Ada Lovelace"]);
    let page = page_with(fixture.snapshot);
    let button = page.element(fixture.buttons[0]);
    assert_eq!(invitee_name(&button), "Ada Lovelace");
    assert_eq!(
        profile_url(&button).as_deref(),
        Some("https://www.linkedin.com/in/ada-lovelace/")
    );
}

#[test]
fn profile_url_search_is_bounded_to_six_ancestor_levels() {
    // Link hangs off the card; the button is buried seven wrappers deep.
    let mut snapshot = DomSnapshot::new();
    let card = snapshot.add_node(
        None,
        NodeData::new("li").with_attr("class", "invitation-card"),
    );
    snapshot.add_node(
        Some(card),
        NodeData::new("a").with_attr("href", "/in/too-deep/"),
    );
    let mut parent: NodeId = card;
    for _ in 0..7 {
        parent = snapshot.add_node(Some(parent), NodeData::new("div"));
    }
    let button = snapshot.add_node(Some(parent), NodeData::new("button").with_text("Accept"));
    let page = page_with(snapshot);
    assert_eq!(profile_url(&page.element(button)), None);
}

#[test]
fn absolute_profile_hrefs_pass_through_unchanged() {
    let mut snapshot = DomSnapshot::new();
    let card = snapshot.add_node(
        None,
        NodeData::new("li").with_attr("class", "invitation-card"),
    );
    snapshot.add_node(
        Some(card),
        NodeData::new("a").with_attr("href", "https://www.linkedin.com/in/ada/"),
    );
    let button = snapshot.add_node(Some(card), NodeData::new("button").with_text("Accept"));
    let page = page_with(snapshot);
    assert_eq!(
        profile_url(&page.element(button)).as_deref(),
        Some("https://www.linkedin.com/in/ada/")
    );
}
