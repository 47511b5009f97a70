use crate::selector::{Selector, SelectorError};

/// A click delivered to a listener.
///
/// `target` is the element the click originated on, `current_target` is the element the
/// listener was registered on. They differ whenever the click bubbled up.
#[derive(Clone, Debug)]
pub struct Click<N> {
    pub target: N,
    pub current_target: N,
}

/// Handle to an element of some host document.
///
/// Handles compare by identity: two handles are equal when they refer to the same element.
pub trait Node: Clone + PartialEq + Sized + 'static {
    fn element(name: &str) -> Self;

    fn name(&self) -> String;

    fn parent(&self) -> Option<Self>;

    /// Element children, text is skipped.
    fn children(&self) -> Vec<Self>;

    fn next_sibling(&self) -> Option<Self>;

    fn prev_sibling(&self) -> Option<Self>;

    fn insert(&self, child: &Self, before: Option<&Self>);

    fn append_text(&self, content: &str);

    fn attr(&self, name: &str) -> Option<String>;

    fn set_attr(&self, name: &str, value: &str);

    fn listen<F>(&self, f: F)
    where
        F: FnMut(&Click<Self>) + 'static;

    /// Dispatches a bubbling click with `self` as the target.
    fn click(&self);

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|name| name == class))
    }

    fn add_class(&self, class: &str) {
        let list = self.attr("class").unwrap_or_default();
        if list.split_ascii_whitespace().any(|name| name == class) {
            return;
        }

        let value = if list.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {class}", list.trim_end())
        };
        self.set_attr("class", &value);
    }

    fn remove_class(&self, class: &str) {
        let Some(list) = self.attr("class") else {
            return;
        };
        if !list.split_ascii_whitespace().any(|name| name == class) {
            return;
        }

        let value = list
            .split_ascii_whitespace()
            .filter(|name| *name != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr("class", &value);
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.matches(self)
    }

    /// Finds the nearest element matching `selector`, **including** `self`.
    fn closest(&self, selector: &Selector) -> Option<Self> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.matches(selector) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// First matching descendant in document order, **excluding** `self`.
    fn query(&self, selector: &Selector) -> Option<Self> {
        for child in self.children() {
            if child.matches(selector) {
                return Some(child);
            }
            if let Some(found) = child.query(selector) {
                return Some(found);
            }
        }
        None
    }

    /// All matching descendants in document order, **excluding** `self`.
    fn query_all(&self, selector: &Selector) -> Vec<Self> {
        let mut found = vec![];
        collect(self, selector, &mut found);
        found
    }

    // Selectors given as CSS text. The defaults only understand what `Selector::parse`
    // accepts, backends with a native selector engine forward the text unchanged.

    fn matches_css(&self, css: &str) -> Result<bool, SelectorError> {
        Ok(self.matches(&Selector::parse(css)?))
    }

    fn closest_css(&self, css: &str) -> Result<Option<Self>, SelectorError> {
        Ok(self.closest(&Selector::parse(css)?))
    }

    fn query_all_css(&self, css: &str) -> Result<Vec<Self>, SelectorError> {
        Ok(self.query_all(&Selector::parse(css)?))
    }
}

fn collect<N: Node>(node: &N, selector: &Selector, out: &mut Vec<N>) {
    for child in node.children() {
        if child.matches(selector) {
            out.push(child.clone());
        }
        collect(&child, selector, out);
    }
}
