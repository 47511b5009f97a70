use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::selector::{is_ident, SelectorError};

const DATA_PREFIX: &str = "data-";

/// Effective configuration of one [`Accordion`](crate::Accordion).
///
/// The `*_data` fields hold attribute-name suffixes: `btn_data = "btn"` means buttons
/// are located through the `data-btn` attribute. `selector` is CSS text handed to the
/// document as is.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Options {
    pub selector: String,
    pub parent_data: String,
    pub btn_data: String,
    pub body_data: String,
    pub active_class_parent: String,
    pub active_class_btn: String,
    pub active_class_body: String,
    pub close_others: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            selector: ".j-accordion".to_string(),
            parent_data: "item".to_string(),
            btn_data: "btn".to_string(),
            body_data: "body".to_string(),
            active_class_parent: "accordion__item_active".to_string(),
            active_class_btn: "accordion__btn_active".to_string(),
            active_class_body: "accordion__body_active".to_string(),
            close_others: true,
        }
    }
}

/// A dynamically typed option value, as handed over by page scripts.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OptionValue {
    Str(String),
    Bool(bool),
    /// Anything else, described by its type name.
    Other(String),
}

#[derive(Clone, PartialEq, Eq, Error, Debug)]
pub enum OptionError {
    #[error("unknown accordion option `{0}`")]
    Unknown(String),
    #[error("accordion option `{key}` expects a {expected}, found {found}")]
    Type {
        key: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("accordion option `{key}` is not a valid selector: {source}")]
    Selector {
        key: &'static str,
        source: SelectorError,
    },
    #[error("accordion option `{key}` is not a valid {expected}: {value:?}")]
    Name {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Clone, Copy, Debug)]
enum Effect {
    Selector,
    Text(Text, Transform),
    CloseOthers,
}

#[derive(Clone, Copy, Debug)]
enum Text {
    ParentData,
    BtnData,
    BodyData,
    ActiveClassParent,
    ActiveClassBtn,
    ActiveClassBody,
}

#[derive(Clone, Copy, Debug)]
enum Transform {
    None,
    StripDataPrefix,
}

impl Text {
    fn expected(self) -> &'static str {
        match self {
            Self::ParentData | Self::BtnData | Self::BodyData => "attribute name",
            Self::ActiveClassParent | Self::ActiveClassBtn | Self::ActiveClassBody => {
                "class name"
            }
        }
    }
}

const OPTIONS: &[(&str, Effect)] = &[
    ("selector", Effect::Selector),
    (
        "selectorParentData",
        Effect::Text(Text::ParentData, Transform::StripDataPrefix),
    ),
    (
        "selectorBtnData",
        Effect::Text(Text::BtnData, Transform::StripDataPrefix),
    ),
    (
        "selectorBodyData",
        Effect::Text(Text::BodyData, Transform::StripDataPrefix),
    ),
    (
        "activeClassParent",
        Effect::Text(Text::ActiveClassParent, Transform::None),
    ),
    (
        "activeClassBtn",
        Effect::Text(Text::ActiveClassBtn, Transform::None),
    ),
    (
        "activeClassBody",
        Effect::Text(Text::ActiveClassBody, Transform::None),
    ),
    ("closeOthers", Effect::CloseOthers),
];

impl Options {
    /// Builds options from `(key, value)` pairs layered over the defaults.
    ///
    /// Problems with individual entries are logged and the entry is skipped.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let mut options = Self::default();
        for (key, value) in entries {
            if let Err(err) = options.set(key.as_ref(), value.into()) {
                warn!("{err}");
            }
        }
        options
    }

    pub fn set(&mut self, key: &str, value: OptionValue) -> Result<(), OptionError> {
        let &(key, effect) = OPTIONS
            .iter()
            .find(|(name, _)| *name == key)
            .ok_or_else(|| OptionError::Unknown(key.to_string()))?;

        match effect {
            Effect::Selector => {
                let value = value.into_string(key)?;
                if value.trim().is_empty() {
                    return Err(OptionError::Selector {
                        key,
                        source: SelectorError::Empty,
                    });
                }
                self.selector = value;
            }
            Effect::Text(text, transform) => {
                let value = transform.apply(value.into_string(key)?);
                if !is_ident(&value) {
                    return Err(OptionError::Name {
                        key,
                        expected: text.expected(),
                        value,
                    });
                }
                *self.text_mut(text) = value;
            }
            Effect::CloseOthers => {
                self.close_others = value.into_bool(key)?;
            }
        }
        Ok(())
    }

    pub fn parent_attr(&self) -> String {
        format!("{DATA_PREFIX}{}", self.parent_data)
    }

    pub fn btn_attr(&self) -> String {
        format!("{DATA_PREFIX}{}", self.btn_data)
    }

    pub fn body_attr(&self) -> String {
        format!("{DATA_PREFIX}{}", self.body_data)
    }

    fn text_mut(&mut self, text: Text) -> &mut String {
        match text {
            Text::ParentData => &mut self.parent_data,
            Text::BtnData => &mut self.btn_data,
            Text::BodyData => &mut self.body_data,
            Text::ActiveClassParent => &mut self.active_class_parent,
            Text::ActiveClassBtn => &mut self.active_class_btn,
            Text::ActiveClassBody => &mut self.active_class_body,
        }
    }
}

impl Transform {
    fn apply(self, value: String) -> String {
        match self {
            Self::None => value,
            Self::StripDataPrefix => strip_data_prefix(value),
        }
    }
}

/// Removes the first case-insensitive occurrence of `data-`.
fn strip_data_prefix(mut value: String) -> String {
    if let Some(idx) = value.to_ascii_lowercase().find(DATA_PREFIX) {
        value.replace_range(idx..idx + DATA_PREFIX.len(), "");
    }
    value
}

impl OptionValue {
    fn into_string(self, key: &'static str) -> Result<String, OptionError> {
        match self {
            Self::Str(value) => Ok(value),
            other => Err(other.mismatch(key, "string")),
        }
    }

    fn into_bool(self, key: &'static str) -> Result<bool, OptionError> {
        match self {
            Self::Bool(value) => Ok(value),
            other => Err(other.mismatch(key, "boolean")),
        }
    }

    fn mismatch(&self, key: &'static str, expected: &'static str) -> OptionError {
        OptionError::Type {
            key,
            expected,
            found: self.to_string(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "string {value:?}"),
            Self::Bool(value) => write!(f, "boolean {value}"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{OptionError, OptionValue, Options};
    use crate::selector::SelectorError;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.selector, ".j-accordion");
        assert_eq!(options.parent_attr(), "data-item");
        assert_eq!(options.btn_attr(), "data-btn");
        assert_eq!(options.body_attr(), "data-body");
        assert!(options.close_others);
    }

    #[test]
    fn recognized_keys_overwrite_defaults() {
        let options = Options::from_entries([
            ("selector", OptionValue::from("#faq .panel")),
            ("activeClassParent", "open".into()),
            ("activeClassBtn", "btn--open".into()),
            ("activeClassBody", "body--open".into()),
            ("closeOthers", false.into()),
        ]);

        assert_eq!(options.selector, "#faq .panel");
        assert_eq!(options.active_class_parent, "open");
        assert_eq!(options.active_class_btn, "btn--open");
        assert_eq!(options.active_class_body, "body--open");
        assert!(!options.close_others);
    }

    #[test]
    fn unknown_keys_leave_defaults_alone() {
        let options = Options::from_entries([
            ("speed", OptionValue::from("fast")),
            ("Selector", ".other".into()),
        ]);
        assert_eq!(options, Options::default());

        let mut options = Options::default();
        assert_eq!(
            options.set("height", OptionValue::Other("number".into())),
            Err(OptionError::Unknown("height".into()))
        );
    }

    #[test]
    fn attribute_keys_strip_one_data_prefix() {
        let options = Options::from_entries([
            ("selectorParentData", "data-panel"),
            ("selectorBtnData", "DATA-toggle"),
            ("selectorBodyData", "content"),
        ]);
        assert_eq!(options.parent_data, "panel");
        assert_eq!(options.btn_data, "toggle");
        assert_eq!(options.body_data, "content");

        let options = Options::from_entries([("selectorBtnData", "data-data-x")]);
        assert_eq!(options.btn_data, "data-x");
        assert_eq!(options.btn_attr(), "data-data-x");
    }

    #[test]
    fn prefix_is_not_stripped_from_class_options() {
        let options = Options::from_entries([("activeClassBtn", "data-open")]);
        assert_eq!(options.active_class_btn, "data-open");
    }

    #[test]
    fn mistyped_values_are_rejected() {
        let mut options = Options::default();
        assert!(matches!(
            options.set("closeOthers", "no".into()),
            Err(OptionError::Type {
                key: "closeOthers",
                expected: "boolean",
                ..
            })
        ));
        assert!(matches!(
            options.set("activeClassBtn", true.into()),
            Err(OptionError::Type { .. })
        ));
        assert_eq!(
            options.set("selector", "  ".into()),
            Err(OptionError::Selector {
                key: "selector",
                source: SelectorError::Empty
            })
        );
        assert_eq!(options, Options::default());
    }

    #[test]
    fn selectors_are_kept_verbatim() {
        for selector in [
            ".faq:not(.static)",
            "[data-role^=acc]",
            ".list + .faq",
            "div.j-accordion:first-child",
        ] {
            let options = Options::from_entries([("selector", selector)]);
            assert_eq!(options.selector, selector);
        }
    }

    #[test]
    fn unusable_names_keep_defaults() {
        let options = Options::from_entries([
            ("activeClassBtn", ""),
            ("activeClassBody", "is open"),
            ("activeClassParent", "a.b"),
            ("selectorBtnData", "data-"),
            ("selectorBodyData", "data-my body"),
            ("selectorParentData", "2nd"),
        ]);
        assert_eq!(options, Options::default());

        let mut options = Options::default();
        assert_eq!(
            options.set("activeClassBtn", "".into()),
            Err(OptionError::Name {
                key: "activeClassBtn",
                expected: "class name",
                value: String::new(),
            })
        );
        assert_eq!(
            options.set("selectorBtnData", "data-".into()),
            Err(OptionError::Name {
                key: "selectorBtnData",
                expected: "attribute name",
                value: String::new(),
            })
        );
    }

    #[test]
    fn later_entries_win() {
        let options = Options::from_entries([
            ("activeClassBtn", "first"),
            ("activeClassBtn", "second"),
        ]);
        assert_eq!(options.active_class_btn, "second");
    }
}
