#![warn(clippy::use_self)]

mod log;
mod node;

pub use node::{document, WebNode};

use accordion_core::{Accordion, OptionValue, Options};
use wasm_bindgen::{prelude::*, JsCast};

/// Page-facing accordion controller.
///
/// ```js
/// const accordion = new Accordion();
/// accordion.init({ selector: '.j-accordion', closeOthers: false });
/// ```
#[wasm_bindgen(js_name = Accordion)]
#[derive(Default)]
pub struct JsAccordion {
    inner: Option<Accordion<WebNode>>,
}

#[wasm_bindgen(js_class = Accordion)]
impl JsAccordion {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every accordion root in the document. `options` may be omitted.
    pub fn init(&mut self, options: JsValue) {
        log::install();

        let options = Options::from_entries(entries(&options));
        let Some(scope) = document().document_element() else {
            return;
        };
        self.inner = Some(Accordion::init(options, &WebNode::from(scope)));
    }

    #[wasm_bindgen(getter, js_name = rootCount)]
    pub fn root_count(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |accordion| accordion.roots().len())
    }
}

fn entries(options: &JsValue) -> Vec<(String, OptionValue)> {
    if options.is_undefined() || options.is_null() {
        return vec![];
    }
    let Some(object) = options.dyn_ref::<js_sys::Object>() else {
        tracing::warn!("accordion options must be an object");
        return vec![];
    };

    js_sys::Object::entries(object)
        .iter()
        .filter_map(|entry| {
            let entry = entry.unchecked_into::<js_sys::Array>();
            let key = entry.get(0).as_string()?;
            Some((key, option_value(&entry.get(1))))
        })
        .collect()
}

fn option_value(value: &JsValue) -> OptionValue {
    if let Some(value) = value.as_string() {
        OptionValue::Str(value)
    } else if let Some(value) = value.as_bool() {
        OptionValue::Bool(value)
    } else {
        OptionValue::Other(value.js_typeof().as_string().unwrap_or_default())
    }
}

#[cfg(all(test, target_family = "wasm"))]
mod tests {
    use accordion_core::{Accordion, Node, Options};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_test::*;

    use crate::{document, entries, JsAccordion, WebNode};

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn accordion_behavior() {
        accordion_core::behavior_tests!(WebNode);
    }

    #[wasm_bindgen_test]
    fn options_from_js_object() {
        let object = js_sys::Object::new();
        js_sys::Reflect::set(&object, &"closeOthers".into(), &JsValue::FALSE).unwrap();
        js_sys::Reflect::set(&object, &"selectorBtnData".into(), &"data-toggle".into()).unwrap();
        js_sys::Reflect::set(&object, &"height".into(), &JsValue::from_f64(20.0)).unwrap();

        let options = Options::from_entries(entries(&object.into()));
        assert!(!options.close_others);
        assert_eq!(options.btn_data, "toggle");
        assert_eq!(Options::from_entries(entries(&JsValue::UNDEFINED)), Options::default());
    }

    #[wasm_bindgen_test]
    fn binds_roots_in_document() {
        let body = WebNode::from(document().body().unwrap().unchecked_into::<web_sys::Element>());
        let button = WebNode::element("button");
        button.set_attr("data-btn", "doc");
        let root = WebNode::element("div");
        root.set_attr("class", "j-accordion");
        root.insert(&button, None);
        body.insert(&root, None);

        let mut accordion = JsAccordion::new();
        accordion.init(JsValue::UNDEFINED);
        assert!(accordion.root_count() >= 1);

        button.click();
        assert!(button.has_class("accordion__btn_active"));

        let scoped = Accordion::init(Options::default(), &root);
        assert_eq!(scoped.roots(), &[root.clone()]);
    }

    #[wasm_bindgen_test]
    fn root_selector_uses_native_engine() {
        let button = WebNode::element("button");
        button.set_attr("data-btn", "q");
        let root = WebNode::element("div");
        root.set_attr("class", "faq");
        root.insert(&button, None);
        let fixed = WebNode::element("div");
        fixed.set_attr("class", "faq static");
        let page = WebNode::element("main");
        page.insert(&root, None);
        page.insert(&fixed, None);

        let options = Options::from_entries([("selector", ".faq:not(.static)")]);
        let accordion = Accordion::init(options, &page);
        assert_eq!(accordion.roots(), &[root.clone()]);

        button.click();
        assert!(button.has_class("accordion__btn_active"));

        let broken = Accordion::init(Options::from_entries([("selector", "div[")]), &page);
        assert!(broken.roots().is_empty());
    }

    #[wasm_bindgen_test]
    fn rejected_dom_calls_are_logged() {
        let node = WebNode::element("div");
        node.add_class("");
        node.add_class("two words");
        node.remove_class("");
        node.set_attr("not valid", "x");
        assert_eq!(node.attr("class"), None);
        assert_eq!(node.attr("not valid"), None);
    }
}
