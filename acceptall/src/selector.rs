use crate::element::PageElement;

/// Represents ways to match a DOM element.
///
/// Unlike a CSS engine this is a small conjunctive matcher: a `Chain` holds
/// refinements that must all hold on the same element, e.g.
/// `tag:button >> text:accept >> enabled:true`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Match by tag name (case-insensitive).
    Tag(String),
    /// Match by trimmed, case-insensitive equality of the element's visible text.
    Text(String),
    /// Match when the `class` attribute contains the fragment.
    ClassFragment(String),
    /// Match by exact attribute value.
    Attr { name: String, value: String },
    /// Match by enabled state.
    Enabled(bool),
    /// All parts must match the same element.
    Chain(Vec<Selector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    /// Whether this selector matches the given element.
    pub fn matches(&self, element: &PageElement) -> bool {
        match self {
            Selector::Tag(tag) => element.tag().eq_ignore_ascii_case(tag),
            Selector::Text(text) => element.text().trim().eq_ignore_ascii_case(text.trim()),
            Selector::ClassFragment(fragment) => element
                .attribute("class")
                .is_some_and(|c| c.contains(fragment.as_str())),
            Selector::Attr { name, value } => {
                element.attribute(name).as_deref() == Some(value.as_str())
            }
            Selector::Enabled(state) => element.is_enabled().unwrap_or(false) == *state,
            Selector::Chain(parts) => parts.iter().all(|part| part.matches(element)),
            Selector::Invalid(_) => false,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // Handle chained selectors first
        let parts: Vec<&str> = s.split(">>").map(|p| p.trim()).collect();
        if parts.len() > 1 {
            return Selector::Chain(parts.into_iter().map(Selector::from).collect());
        }

        match s {
            _ if s.starts_with("tag:") => Selector::Tag(s[4..].trim().to_string()),
            _ if s.starts_with("text:") => Selector::Text(s[5..].to_string()),
            _ if s.to_lowercase().starts_with("class:") => {
                Selector::ClassFragment(s[6..].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("enabled:") => {
                let value = s[8..].trim().to_lowercase();
                Selector::Enabled(value == "true")
            }
            _ if s.starts_with("attr:") => {
                let body = &s[5..];
                match body.split_once('=') {
                    Some((name, value)) => Selector::Attr {
                        name: name.trim().to_string(),
                        value: value.trim().to_string(),
                    },
                    None => Selector::Invalid(format!(
                        "attr selector needs name=value, got: '{body}'"
                    )),
                }
            }
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'tag:', 'text:', 'class:', 'attr:name=value', or 'enabled:'."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}
