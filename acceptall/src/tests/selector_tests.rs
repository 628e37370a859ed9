//! Selector parsing and matching, plus locator behavior over the mock page.

use crate::dom::{DomSnapshot, NodeData};
use crate::engine::PageEngine;
use crate::errors::AutomationError;
use crate::mock::{MockPage, ScrollStep};
use crate::selector::Selector;
use crate::Page;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn parses_chained_prefix_selectors() {
    let selector = Selector::from("tag:button >> text:accept >> enabled:true");
    assert_eq!(
        selector,
        Selector::Chain(vec![
            Selector::Tag("button".into()),
            Selector::Text("accept".into()),
            Selector::Enabled(true),
        ])
    );
}

#[test]
fn parses_attr_and_class_selectors() {
    assert_eq!(
        Selector::from("attr:aria-label=Accept"),
        Selector::Attr {
            name: "aria-label".into(),
            value: "Accept".into(),
        }
    );
    assert_eq!(
        Selector::from("class:invitation-card"),
        Selector::ClassFragment("invitation-card".into())
    );
}

#[test]
fn unknown_prefix_is_invalid() {
    assert!(matches!(Selector::from("bogus"), Selector::Invalid(_)));
    assert!(matches!(Selector::from("attr:no-equals"), Selector::Invalid(_)));
}

fn sample_page() -> (MockPage, usize, usize, usize) {
    let mut snapshot = DomSnapshot::new();
    let body = snapshot.add_node(None, NodeData::new("body"));
    let accept = snapshot.add_node(
        Some(body),
        NodeData::new("button").with_text("  Accept \n"),
    );
    let disabled = snapshot.add_node(
        Some(body),
        NodeData::new("button").with_text("Accept").disabled(),
    );
    let other = snapshot.add_node(Some(body), NodeData::new("button").with_text("Ignore"));
    (MockPage::new(snapshot), accept, disabled, other)
}

#[test]
fn text_matching_is_trimmed_and_case_insensitive() {
    let (page, accept, _, _) = sample_page();
    let selector = Selector::from("text:ACCEPT");
    assert!(selector.matches(&page.element(accept)));
}

#[tokio::test]
async fn enabled_filter_excludes_disabled_controls() {
    let (page, accept, disabled, other) = sample_page();
    let selector = Selector::from("tag:button >> text:accept >> enabled:true");

    let found = page.find_elements(&selector, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], page.element(accept));
    assert_ne!(found[0], page.element(disabled));
    assert_ne!(found[0], page.element(other));
}

#[tokio::test]
async fn nested_text_still_counts_as_control_text() {
    // Button text rendered through a span, the way the site builds buttons.
    let mut snapshot = DomSnapshot::new();
    let button = snapshot.add_node(None, NodeData::new("button"));
    snapshot.add_node(
        Some(button),
        NodeData::new("span")
            .with_attr("class", "artdeco-button__text")
            .with_text("Accept"),
    );
    let page = MockPage::new(snapshot);

    let found = page
        .find_elements(&Selector::from("tag:button >> text:accept"), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], page.element(button));
}

#[test]
fn scan_script_substitutes_every_marker() {
    use crate::agent::AcceptAgent;
    use crate::remote::RemoteEngine;

    let script = RemoteEngine::scan_script(&AcceptAgent::accept_selector()).unwrap();
    assert!(script.contains("const MAX_NODES = 512;"));
    assert!(script.contains("\"button\""));
    assert!(script.contains("\"accept\""));
    assert!(script.contains("const requireEnabled = true;"));
    for marker in [
        "__TAG__",
        "__TEXT__",
        "__CLASS__",
        "__ENABLED__",
        "__MAX_NODES__",
    ] {
        assert!(!script.contains(marker), "{marker} left unsubstituted");
    }

    // Attribute atoms have no scan translation.
    let unsupported = RemoteEngine::scan_script(&Selector::from("attr:role=button"));
    assert!(matches!(
        unsupported,
        Err(AutomationError::UnsupportedOperation(_))
    ));
}

#[tokio::test]
async fn locator_scopes_to_a_root_element() {
    let mut snapshot = DomSnapshot::new();
    let body = snapshot.add_node(None, NodeData::new("body"));
    let outside = snapshot.add_node(Some(body), NodeData::new("button").with_text("Accept"));
    let card = snapshot.add_node(
        Some(body),
        NodeData::new("li").with_attr("class", "invitation-card"),
    );
    let inside = snapshot.add_node(Some(card), NodeData::new("button").with_text("Accept"));
    let mock = MockPage::new(snapshot);
    let page = Page::new(Arc::new(mock.clone()));

    let all = page.locator("tag:button >> text:accept").all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.contains(&mock.element(outside)));

    let scoped = page
        .locator("tag:button >> text:accept")
        .within(mock.element(card))
        .all()
        .await
        .unwrap();
    assert_eq!(scoped, [mock.element(inside)]);
}

#[tokio::test]
async fn locator_first_waits_for_a_revealed_control() {
    let fixture = super::invitation_page(&["Ada Lovelace"]);
    let buttons = fixture.buttons.clone();
    let mock = MockPage::new(fixture.snapshot);
    mock.hide(buttons.clone());
    let page = Page::new(Arc::new(mock.clone()));
    let locator = page.locator("tag:button >> text:accept");

    // Nothing visible yet, so a short wait times out.
    let miss = locator.first(Some(Duration::from_millis(50))).await;
    assert!(matches!(miss, Err(AutomationError::Timeout(_))));

    // Reveal the control from another task while first() is polling.
    let revealer = {
        let mock = mock.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            mock.push_scroll_step(ScrollStep {
                height: 1400.0,
                reveal: buttons,
            });
            mock.scroll_to_bottom().await.unwrap();
        })
    };
    let found = locator
        .first(Some(Duration::from_secs(2)))
        .await
        .expect("control appears");
    revealer.await.unwrap();
    assert_eq!(found, mock.element(fixture.buttons[0]));
}
