use std::{cell::RefCell, thread_local};

use accordion_core::{Click, Node, Selector, SelectorError};
use tracing::warn;
use wasm_bindgen::{intern, prelude::*, JsCast};

thread_local! {
    static DOCUMENT: web_sys::Document = web_sys::window()
        .expect("JavaScript window undefined")
        .document()
        .expect("JavaScript window.document undefined");

    // click listeners stay attached for the lifetime of the page
    static LISTENERS: RefCell<Vec<EventClosure>> = RefCell::default();
}

pub fn document() -> web_sys::Document {
    DOCUMENT.with(Clone::clone)
}

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;

/// A live DOM element.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WebNode(web_sys::Element);

impl WebNode {
    pub fn native(&self) -> &web_sys::Element {
        &self.0
    }

    /// Resolves an event target to an element, text nodes resolve to their parent.
    fn from_target(target: Option<web_sys::EventTarget>) -> Option<Self> {
        let node = target?.dyn_into::<web_sys::Node>().ok()?;
        match node.dyn_into::<web_sys::Element>() {
            Ok(element) => Some(Self(element)),
            Err(node) => node.parent_element().map(Self),
        }
    }
}

impl From<web_sys::Element> for WebNode {
    fn from(element: web_sys::Element) -> Self {
        Self(element)
    }
}

impl Node for WebNode {
    fn element(name: &str) -> Self {
        let native = DOCUMENT
            .with(|document| document.create_element(intern(name)))
            .unwrap();
        Self(native)
    }

    fn name(&self) -> String {
        self.0.tag_name().to_ascii_lowercase()
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent_element().map(Self)
    }

    fn children(&self) -> Vec<Self> {
        let children = self.0.children();
        (0..children.length())
            .filter_map(|i| children.item(i))
            .map(Self)
            .collect()
    }

    fn next_sibling(&self) -> Option<Self> {
        self.0.next_element_sibling().map(Self)
    }

    fn prev_sibling(&self) -> Option<Self> {
        self.0.previous_element_sibling().map(Self)
    }

    fn insert(&self, child: &Self, before: Option<&Self>) {
        let before = before.map(|node| -> &web_sys::Node { &node.0 });
        report("insertBefore", self.0.insert_before(&child.0, before));
    }

    fn append_text(&self, content: &str) {
        report("append", self.0.append_with_str_1(content));
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn set_attr(&self, name: &str, value: &str) {
        report("setAttribute", self.0.set_attribute(intern(name), value));
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.class_list().contains(class)
    }

    fn add_class(&self, class: &str) {
        report("classList.add", self.0.class_list().add_1(intern(class)));
    }

    fn remove_class(&self, class: &str) {
        report("classList.remove", self.0.class_list().remove_1(intern(class)));
    }

    fn matches(&self, selector: &Selector) -> bool {
        self.0.matches(&selector.to_string()).unwrap_or(false)
    }

    fn closest(&self, selector: &Selector) -> Option<Self> {
        self.0
            .closest(&selector.to_string())
            .ok()
            .flatten()
            .map(Self)
    }

    fn query(&self, selector: &Selector) -> Option<Self> {
        self.0
            .query_selector(&selector.to_string())
            .ok()
            .flatten()
            .map(Self)
    }

    fn query_all(&self, selector: &Selector) -> Vec<Self> {
        let Ok(list) = self.0.query_selector_all(&selector.to_string()) else {
            return vec![];
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .map(Self)
            .collect()
    }

    fn matches_css(&self, css: &str) -> Result<bool, SelectorError> {
        self.0.matches(css).map_err(|_| unsupported(css))
    }

    fn closest_css(&self, css: &str) -> Result<Option<Self>, SelectorError> {
        let found = self.0.closest(css).map_err(|_| unsupported(css))?;
        Ok(found.map(Self))
    }

    fn query_all_css(&self, css: &str) -> Result<Vec<Self>, SelectorError> {
        let list = self.0.query_selector_all(css).map_err(|_| unsupported(css))?;
        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .map(Self)
            .collect())
    }

    fn listen<F>(&self, mut f: F)
    where
        F: FnMut(&Click<Self>) + 'static,
    {
        let closure = EventClosure::new(move |ev: web_sys::Event| {
            let target = Self::from_target(ev.target());
            let current_target = Self::from_target(ev.current_target());
            if let (Some(target), Some(current_target)) = (target, current_target) {
                f(&Click {
                    target,
                    current_target,
                });
            }
        });

        report(
            "addEventListener",
            self.0
                .add_event_listener_with_callback(intern("click"), closure.as_ref().unchecked_ref()),
        );
        LISTENERS.with(|listeners| listeners.borrow_mut().push(closure));
    }

    fn click(&self) {
        if let Some(element) = self.0.dyn_ref::<web_sys::HtmlElement>() {
            element.click();
        }
    }
}

fn unsupported(css: &str) -> SelectorError {
    SelectorError::Unsupported(css.to_string())
}

/// Logs a DOM call the browser rejected.
fn report<T>(call: &str, result: Result<T, JsValue>) {
    if let Err(err) = result {
        warn!("{call} failed: {err:?}");
    }
}
