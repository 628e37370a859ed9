//! Best-effort invitee identity extraction.
//!
//! The invitation page carries no stable API, so the invitee's name and
//! profile link are sniffed out of the DOM around each Accept control. The
//! heuristics are an ordered list of pure strategies tried in sequence; the
//! accessible-label pattern wins over structural sniffing, which wins over
//! the `"Unknown"` sentinel. Each strategy is a plain function over a
//! `PageElement`, so all of them are testable against snapshot trees.

use crate::element::PageElement;
use tracing::trace;

/// Sentinel used when no strategy can produce a name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Path fragment identifying a member profile link.
pub const PROFILE_PATH_FRAGMENT: &str = "/in/";

/// Origin used to absolutize relative profile hrefs.
pub const SITE_ORIGIN: &str = "https://www.linkedin.com";

/// Ancestor levels searched for a profile link.
const MAX_ANCESTOR_DEPTH: usize = 6;

/// Class fragments that mark the invitee's name node, most specific first.
const NAME_CLASS_FRAGMENTS: &[&str] = &["invitation-card__name", "member-name", "name"];

type NameStrategy = fn(&PageElement) -> Option<String>;

const NAME_STRATEGIES: &[(&str, NameStrategy)] = &[
    ("accessible-label", name_from_accessible_label),
    ("card-class", name_from_card_class),
    ("bold-text", name_from_bold_text),
    ("profile-link", name_from_profile_link),
];

/// Derive the invitee name for an Accept control.
pub fn invitee_name(control: &PageElement) -> String {
    for (label, strategy) in NAME_STRATEGIES {
        if let Some(name) = strategy(control) {
            trace!(strategy = label, name = %name, "extracted invitee name");
            return name;
        }
    }
    UNKNOWN_NAME.to_string()
}

/// Derive the invitee's profile URL by searching ancestor containers,
/// bounded to [`MAX_ANCESTOR_DEPTH`] levels above the control.
pub fn profile_url(control: &PageElement) -> Option<String> {
    let mut current = control.parent().ok().flatten();
    let mut depth = 0;
    while let Some(ancestor) = current {
        if depth >= MAX_ANCESTOR_DEPTH {
            break;
        }
        if let Some(link) = find_profile_link(&ancestor) {
            return link.attribute("href").map(absolutize);
        }
        current = ancestor.parent().ok().flatten();
        depth += 1;
    }
    None
}

fn absolutize(href: String) -> String {
    if href.starts_with('/') {
        format!("{SITE_ORIGIN}{href}")
    } else {
        href
    }
}

/// Parse `Accept <name>'s invitation...` out of the control's accessible label.
fn name_from_accessible_label(control: &PageElement) -> Option<String> {
    let label = control.attribute("aria-label")?;
    let label = label.trim();
    let rest = label
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("accept "))
        .map(|_| &label[7..])?;
    // Possessive-suffix stripping, both ASCII and typographic apostrophes.
    for suffix in ["'s invitation", "\u{2019}s invitation"] {
        if let Some(pos) = rest.find(suffix) {
            let name = rest[..pos].trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Nearest list/card ancestor, then a descendant carrying a known name class.
fn name_from_card_class(control: &PageElement) -> Option<String> {
    let card = invitation_card(control)?;
    for fragment in NAME_CLASS_FRAGMENTS {
        if let Some(node) = find_descendant(&card, &|el| {
            el.class_list().iter().any(|c| c.contains(fragment))
        }) {
            let text = node.text();
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// First bolded text inside the invitation card.
fn name_from_bold_text(control: &PageElement) -> Option<String> {
    let card = invitation_card(control)?;
    let node = find_descendant(&card, &|el| {
        let tag = el.tag();
        tag.eq_ignore_ascii_case("strong") || tag.eq_ignore_ascii_case("b")
    })?;
    let text = node.text();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Text of the profile link inside the invitation card.
fn name_from_profile_link(control: &PageElement) -> Option<String> {
    let card = invitation_card(control)?;
    let link = find_profile_link(&card)?;
    let text = link.text();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Nearest ancestor that looks like the invitation's list entry or card.
fn invitation_card(control: &PageElement) -> Option<PageElement> {
    let mut current = control.parent().ok().flatten();
    while let Some(ancestor) = current {
        if ancestor.tag().eq_ignore_ascii_case("li")
            || ancestor.class_list().iter().any(|c| c.contains("card"))
        {
            return Some(ancestor);
        }
        current = ancestor.parent().ok().flatten();
    }
    None
}

fn find_profile_link(scope: &PageElement) -> Option<PageElement> {
    find_descendant(scope, &|el| {
        el.tag().eq_ignore_ascii_case("a")
            && el
                .attribute("href")
                .is_some_and(|href| href.contains(PROFILE_PATH_FRAGMENT))
    })
}

/// Depth-first search for the first descendant matching the predicate,
/// excluding `scope` itself.
fn find_descendant(
    scope: &PageElement,
    predicate: &dyn Fn(&PageElement) -> bool,
) -> Option<PageElement> {
    for child in scope.children().ok()? {
        if predicate(&child) {
            return Some(child);
        }
        if let Some(found) = find_descendant(&child, predicate) {
            return Some(found);
        }
    }
    None
}
