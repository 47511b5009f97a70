#![warn(clippy::use_self)]

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt::{self, Write},
    rc::{Rc, Weak},
};

use accordion_core::{Click, Node};
use indexmap::IndexMap;

// Reference: https://developer.mozilla.org/en-US/docs/Glossary/Void_element
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Element of an in-memory document.
///
/// Used to render accordion markup outside of a browser and to exercise the accordion
/// natively. Clicks bubble from the target through every ancestor like in a browser.
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<Inner>>);

type WeakNode = Weak<RefCell<Inner>>;
type Listener = Rc<RefCell<dyn FnMut(&Click<NodeRef>)>>;

struct Inner {
    parent: Option<WeakNode>,
    kind: NodeKind,
    listeners: Vec<Listener>,
}

#[derive(Debug)]
enum NodeKind {
    Element {
        name: String,
        attrs: IndexMap<String, String>,
        children: Vec<NodeRef>,
    },
    Text(String),
}

impl NodeRef {
    fn new(kind: NodeKind) -> Self {
        let inner = Inner {
            parent: None,
            kind,
            listeners: vec![],
        };
        Self(Rc::new(RefCell::new(inner)))
    }

    fn text_node(content: &str) -> Self {
        Self::new(NodeKind::Text(content.to_string()))
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(self, child: &Self) -> Self {
        self.insert(child, None);
        self
    }

    pub fn with_text(self, content: &str) -> Self {
        self.append_text(content);
        self
    }

    fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element { .. })
    }

    fn raw_parent(&self) -> Option<Self> {
        self.0
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(NodeRef)
    }

    fn children_ref(&self) -> Ref<Vec<Self>> {
        Ref::map(self.0.borrow(), |inner| match &inner.kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text(_) => panic!("text nodes have no children"),
        })
    }

    fn children_mut(&self) -> RefMut<Vec<Self>> {
        RefMut::map(self.0.borrow_mut(), |inner| match &mut inner.kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text(_) => panic!("text nodes have no children"),
        })
    }

    fn attrs_mut(&self) -> RefMut<IndexMap<String, String>> {
        RefMut::map(self.0.borrow_mut(), |inner| match &mut inner.kind {
            NodeKind::Element { attrs, .. } => attrs,
            NodeKind::Text(_) => panic!("attributes only exist on element nodes"),
        })
    }

    /// Nearest element sibling in one direction, text is skipped.
    fn sibling(&self, forward: bool) -> Option<Self> {
        let parent = self.raw_parent()?;
        let children = parent.children_ref();
        let idx = children.iter().position(|node| node == self)?;

        if forward {
            children[idx + 1..].iter().find(|node| node.is_element()).cloned()
        } else {
            children[..idx]
                .iter()
                .rev()
                .find(|node| node.is_element())
                .cloned()
        }
    }
}

impl Node for NodeRef {
    fn element(name: &str) -> Self {
        Self::new(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attrs: IndexMap::new(),
            children: vec![],
        })
    }

    fn name(&self) -> String {
        match &self.0.borrow().kind {
            NodeKind::Element { name, .. } => name.clone(),
            NodeKind::Text(_) => "#text".to_string(),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.raw_parent()
    }

    fn children(&self) -> Vec<Self> {
        self.children_ref()
            .iter()
            .filter(|node| node.is_element())
            .cloned()
            .collect()
    }

    fn next_sibling(&self) -> Option<Self> {
        self.sibling(true)
    }

    fn prev_sibling(&self) -> Option<Self> {
        self.sibling(false)
    }

    fn insert(&self, child: &Self, before: Option<&Self>) {
        if let Some(parent) = child.raw_parent() {
            let mut siblings = parent.children_mut();
            if let Some(idx) = siblings.iter().position(|node| node == child) {
                siblings.remove(idx);
            }
        }

        {
            let mut children = self.children_mut();
            let idx = if let Some(before) = before {
                children
                    .iter()
                    .position(|node| node == before)
                    .expect("not a parent of insertion point node")
            } else {
                children.len()
            };
            children.insert(idx, child.clone());
        }

        child.0.borrow_mut().parent.replace(Rc::downgrade(&self.0));
    }

    fn append_text(&self, content: &str) {
        self.insert(&Self::text_node(content), None);
    }

    fn attr(&self, name: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    fn set_attr(&self, name: &str, value: &str) {
        self.attrs_mut().insert(name.to_string(), value.to_string());
    }

    fn listen<F>(&self, f: F)
    where
        F: FnMut(&Click<Self>) + 'static,
    {
        let listener: Listener = Rc::new(RefCell::new(f));
        self.0.borrow_mut().listeners.push(listener);
    }

    fn click(&self) {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            // listeners mutate the tree, so nothing may stay borrowed while they run
            let listeners = node.0.borrow().listeners.clone();
            let click = Click {
                target: self.clone(),
                current_target: node.clone(),
            };
            for listener in listeners {
                (&mut *listener.borrow_mut())(&click);
            }
            current = node.raw_parent();
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        match &inner.kind {
            NodeKind::Element {
                name,
                attrs,
                children,
            } => {
                let mut buf = String::new();
                for child in children {
                    writeln!(&mut buf, "{child}")?;
                }
                let indented = buf
                    .lines()
                    .map(|line| format!("  {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");

                let attrs = attrs
                    .iter()
                    .map(|(name, value)| format!(" {name}=\"{}\"", escape(value)))
                    .collect::<Vec<_>>()
                    .join("");

                if !indented.is_empty() {
                    write!(f, "<{name}{attrs}>\n{indented}\n</{name}>")
                } else if VOID_ELEMENTS.contains(&name.as_str()) {
                    write!(f, "<{name}{attrs}>")
                } else {
                    write!(f, "<{name}{attrs}></{name}>")
                }
            }
            NodeKind::Text(text) => f.write_str(&escape(text)),
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        match &inner.kind {
            NodeKind::Element { name, attrs, .. } => {
                f.debug_struct("Element").field("name", name).field("attrs", attrs).finish()
            }
            NodeKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NodeRef {}

// Reference: https://cheatsheetseries.owasp.org/cheatsheets/Cross_Site_Scripting_Prevention_Cheat_Sheet.html#output-encoding-for-html-contexts
fn escape(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use accordion_core::{
        accordion::{neighbour_items, next_items, prev_items},
        Accordion, ItemState, Node, Options, Selector,
    };

    use super::NodeRef;

    fn el(name: &str) -> NodeRef {
        NodeRef::element(name)
    }

    #[test]
    fn accordion_behavior() {
        accordion_core::behavior_tests!(NodeRef);
    }

    #[test]
    fn renders_markup() {
        let root = el("div")
            .with_attr("class", "j-accordion")
            .with_attr("data-note", "a \"b\" <c>")
            .with_child(&el("button").with_attr("data-btn", "a").with_text("Q & A"))
            .with_child(&el("br"));

        assert_eq!(
            root.to_string(),
            "<div class=\"j-accordion\" data-note=\"a &quot;b&quot; &lt;c&gt;\">\n  \
             <button data-btn=\"a\">\n    Q &amp; A\n  </button>\n  <br>\n</div>"
        );
    }

    #[test]
    fn siblings_skip_text() {
        let a = el("li");
        let b = el("li");
        let c = el("li");
        let list = el("ul").with_child(&a).with_text("gap").with_child(&b);
        list.append_text("gap");
        list.insert(&c, None);

        assert_eq!(list.children(), vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(a.next_sibling(), Some(b.clone()));
        assert_eq!(c.prev_sibling(), Some(b.clone()));
        assert_eq!(a.prev_sibling(), None);
        assert_eq!(c.next_sibling(), None);

        assert_eq!(next_items(&a), vec![b.clone(), c.clone()]);
        assert_eq!(prev_items(&c), vec![b.clone(), a.clone()]);
        assert_eq!(neighbour_items(&b), vec![a.clone(), c.clone()]);
        assert!(neighbour_items(&list).is_empty());
    }

    #[test]
    fn insert_moves_nodes() {
        let a = el("p");
        let b = el("p");
        let first = el("div").with_child(&a).with_child(&b);
        let second = el("div");

        second.insert(&a, None);
        first.insert(&a, Some(&b));

        assert!(second.children().is_empty());
        assert_eq!(first.children(), vec![a.clone(), b]);
        assert_eq!(a.parent(), Some(first));
    }

    #[test]
    fn class_list_editing() {
        let node = el("div").with_attr("class", "  one two ");

        node.add_class("two");
        assert_eq!(node.attr("class").as_deref(), Some("  one two "));

        node.add_class("three");
        assert_eq!(node.attr("class").as_deref(), Some("  one two three"));

        node.remove_class("one");
        assert_eq!(node.attr("class").as_deref(), Some("two three"));
        assert!(node.has_class("three"));
        assert!(!node.has_class("thr"));

        let bare = el("div");
        bare.remove_class("x");
        assert_eq!(bare.attr("class"), None);
        bare.add_class("x");
        assert_eq!(bare.attr("class").as_deref(), Some("x"));
    }

    #[test]
    fn selector_matching() {
        let target = el("li").with_attr("class", "entry open").with_attr("data-key", "a b");
        let list = el("ul").with_attr("id", "faq").with_child(&target);
        let page = el("main").with_child(&el("section").with_child(&list));

        let matches = |input: &str| Selector::parse(input).unwrap().matches(&target);
        assert!(matches("li"));
        assert!(matches("LI.entry.open"));
        assert!(matches("#faq > li"));
        assert!(matches("main li[data-key='a b']"));
        assert!(matches("main > section > ul > .entry"));
        assert!(matches("nav, .open"));
        assert!(!matches("main > li"));
        assert!(!matches("[data-key=a]"));
        assert!(!matches("section > li"));

        let found = page.query_all(&Selector::parse("ul, li").unwrap());
        assert_eq!(found, vec![list.clone(), target.clone()]);
        assert_eq!(page.query(&Selector::class("open")), Some(target.clone()));
        assert_eq!(
            target.closest(&Selector::parse("#faq").unwrap()),
            Some(list.clone())
        );
        assert_eq!(target.closest(&Selector::class("entry")), Some(target));
        assert_eq!(page.closest(&Selector::class("entry")), None);
    }

    #[test]
    fn clicks_bubble_to_listeners() {
        let inner = el("span");
        let outer = el("div").with_child(&inner);
        let seen = Rc::new(RefCell::new(vec![]));

        let log = seen.clone();
        outer.listen(move |click| {
            log.borrow_mut()
                .push((click.target.name(), click.current_target.name()));
        });

        inner.click();
        outer.click();
        assert_eq!(
            *seen.borrow(),
            vec![
                ("span".to_string(), "div".to_string()),
                ("div".to_string(), "div".to_string())
            ]
        );
    }

    fn item(key: &str) -> (NodeRef, NodeRef, NodeRef) {
        let button = el("button").with_attr("data-btn", key);
        let body = el("div").with_attr("data-body", key);
        let item = el("div")
            .with_attr("data-item", "")
            .with_child(&button)
            .with_child(&body);
        (item, button, body)
    }

    #[test]
    fn body_is_found_by_key_anywhere_in_root() {
        let button = el("button").with_attr("data-btn", "q1");
        let body = el("div").with_attr("data-body", "q1");
        let root = el("div")
            .with_attr("class", "j-accordion")
            .with_child(&el("nav").with_child(&button))
            .with_child(&el("article").with_child(&body));
        let accordion = Accordion::init(Options::default(), &root);

        let toggle = accordion.handle_click(&root, &button).unwrap();
        assert_eq!(toggle.state, ItemState::Open);
        assert_eq!(toggle.item.body, Some(body.clone()));
        assert_eq!(toggle.item.parent, None);
        assert!(body.has_class("accordion__body_active"));
        assert!(button.has_class("accordion__btn_active"));
    }

    #[test]
    fn missing_body_and_parent_are_skipped() {
        let button = el("button").with_attr("data-btn", "lonely");
        let root = el("div").with_attr("class", "j-accordion").with_child(&button);
        Accordion::init(Options::default(), &root);

        button.click();
        assert_eq!(button.attr("class").as_deref(), Some("accordion__btn_active"));
        button.click();
        assert!(!button.has_class("accordion__btn_active"));
    }

    #[test]
    fn close_others_leaves_nested_accordions() {
        let (inner_item, inner_button, inner_body) = item("inner");
        let (a, a_button, a_body) = item("a");
        a_body.insert(&el("div").with_child(&inner_item), None);
        let (b, b_button, _) = item("b");
        let root = el("div")
            .with_attr("class", "j-accordion")
            .with_child(&a)
            .with_child(&b);
        Accordion::init(Options::default(), &root);

        a_button.click();
        inner_button.click();
        assert!(inner_item.has_class("accordion__item_active"));
        assert!(inner_body.has_class("accordion__body_active"));
        assert!(a.has_class("accordion__item_active"));

        b_button.click();
        assert!(!a.has_class("accordion__item_active"));
        assert!(!a_button.has_class("accordion__btn_active"));
        assert!(!a_body.has_class("accordion__body_active"));
        assert!(inner_item.has_class("accordion__item_active"));
        assert!(inner_button.has_class("accordion__btn_active"));
        assert!(inner_body.has_class("accordion__body_active"));
    }

    #[test]
    fn flat_layout_closes_sibling_buttons() {
        let a_button = el("button").with_attr("data-btn", "a");
        let a_body = el("div").with_attr("data-body", "a");
        let b_button = el("button").with_attr("data-btn", "b");
        let b_body = el("div").with_attr("data-body", "b");
        let root = el("div")
            .with_attr("class", "j-accordion")
            .with_child(&a_button)
            .with_child(&a_body)
            .with_child(&b_button)
            .with_child(&b_body);
        Accordion::init(Options::default(), &root);

        a_button.click();
        assert!(a_body.has_class("accordion__body_active"));

        b_button.click();
        assert!(!a_button.has_class("accordion__btn_active"));
        assert!(!a_body.has_class("accordion__body_active"));
        assert!(b_button.has_class("accordion__btn_active"));
        assert!(b_body.has_class("accordion__body_active"));
    }

    #[test]
    fn selectors_outside_the_parsed_subset_bind_nothing() {
        let (a, a_button, _) = item("a");
        let root = el("div").with_attr("class", "faq").with_child(&a);
        let page = el("main").with_child(&root);

        let options = Options::from_entries([("selector", ".faq:not(.static)")]);
        let accordion = Accordion::init(options, &page);
        assert!(accordion.roots().is_empty());
        assert_eq!(accordion.options().selector, ".faq:not(.static)");

        a_button.click();
        assert!(!a.has_class("accordion__item_active"));
    }

    #[test]
    fn buttons_of_other_roots_are_ignored() {
        let (inner_item, inner_button, _) = item("inner");
        let inner = el("div").with_attr("class", "j-accordion").with_child(&inner_item);
        let outer = el("div").with_attr("class", "j-accordion").with_child(&inner);
        let accordion = Accordion::<NodeRef>::new(Options::default());

        assert_eq!(accordion.handle_click(&outer, &inner_button), None);
        assert!(!inner_button.has_class("accordion__btn_active"));

        let toggle = accordion.handle_click(&inner, &inner_button).unwrap();
        assert_eq!(toggle.state, ItemState::Open);
        assert!(inner_item.has_class("accordion__item_active"));
    }

    #[test]
    fn scope_can_be_the_root() {
        let (a, a_button, _) = item("a");
        let root = el("div").with_attr("class", "j-accordion").with_child(&a);
        let accordion = Accordion::init(Options::default(), &root);
        assert_eq!(accordion.roots(), &[root.clone()]);

        a_button.click();
        assert!(a.has_class("accordion__item_active"));
    }
}
