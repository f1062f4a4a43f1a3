//! Rules that splice synthetic elements around or into a matched element.
use crate::name::QName;

/// Where and how an [`AppendRule`] injects its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Wrap the matched element in a new parent.
    PreWrap,
    /// Insert a sibling element holding literal text before the match.
    PreInclude,
    /// Wrap the content of the matched element in a new child.
    PostWrap,
    /// Insert a child element holding literal text as the last child.
    PostInclude,
}

/// One synthetic content injection.
///
/// The rule is keyed by the name of the element that triggers it (see
/// `TransformRules::appends`).  If the target equals that trigger name and
/// text is present, the rule replaces the element's text content instead
/// of appending anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRule {
    target: QName,
    text: Option<String>,
    child: bool,
}

impl AppendRule {
    /// Creates a new rule.
    pub fn new(target: QName, text: Option<String>, child: bool) -> AppendRule {
        AppendRule {
            target,
            text,
            child,
        }
    }

    /// The name of the element to inject.
    #[inline]
    pub fn target(&self) -> &QName {
        &self.target
    }

    /// Literal text content, if any.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Does the injection happen inside the matched element?
    #[inline]
    pub fn is_child(&self) -> bool {
        self.child
    }

    /// Consumes the rule and returns its literal text.
    pub fn into_text(self) -> Option<String> {
        self.text
    }

    /// Classifies the rule into one of the four injection modes.
    pub fn mode(&self) -> AppendMode {
        match (self.child, self.text.is_some()) {
            (false, false) => AppendMode::PreWrap,
            (false, true) => AppendMode::PreInclude,
            (true, false) => AppendMode::PostWrap,
            (true, true) => AppendMode::PostInclude,
        }
    }

    /// Does this rule replace the text content of `trigger`?
    pub fn replaces_content_of(&self, trigger: &QName) -> bool {
        &self.target == trigger
    }
}
