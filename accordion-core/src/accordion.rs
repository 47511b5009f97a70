use std::{iter, rc::Rc};

use tracing::{debug, warn};

use crate::{
    node::{Click, Node},
    options::Options,
    selector::Selector,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

/// The elements one button controls.
#[derive(Clone, PartialEq, Debug)]
pub struct Item<N> {
    pub button: N,
    pub parent: Option<N>,
    pub body: Option<N>,
}

impl<N: Node> Item<N> {
    /// An item is open when its button carries the active class.
    pub fn state(&self, options: &Options) -> ItemState {
        if self.button.has_class(&options.active_class_btn) {
            ItemState::Open
        } else {
            ItemState::Closed
        }
    }

    /// Applies `state` to all present elements at once.
    pub fn render(&self, state: ItemState, options: &Options) {
        let apply: fn(&N, &str) = match state {
            ItemState::Open => open,
            ItemState::Closed => close,
        };

        apply(&self.button, &options.active_class_btn);
        if let Some(parent) = &self.parent {
            apply(parent, &options.active_class_parent);
        }
        if let Some(body) = &self.body {
            apply(body, &options.active_class_body);
        }
    }
}

/// Outcome of a click that hit a button.
#[derive(Clone, PartialEq, Debug)]
pub struct Toggle<N> {
    pub item: Item<N>,
    pub state: ItemState,
}

pub struct Accordion<N> {
    options: Rc<Options>,
    roots: Vec<N>,
}

impl<N: Node> Accordion<N> {
    pub fn new(options: Options) -> Self {
        Self {
            options: Rc::new(options),
            roots: vec![],
        }
    }

    /// Creates an accordion and binds every root found in `scope`.
    pub fn init(options: Options, scope: &N) -> Self {
        let mut accordion = Self::new(options);
        accordion.attach(scope);
        accordion
    }

    /// Binds a delegated click listener to every element in `scope` (itself included)
    /// that matches the root selector.
    pub fn attach(&mut self, scope: &N) {
        let selector = self.options.selector.as_str();
        let mut roots = match scope.query_all_css(selector) {
            Ok(roots) => roots,
            Err(err) => {
                warn!(%selector, "accordion roots not bound: {err}");
                return;
            }
        };
        if scope.matches_css(selector).unwrap_or(false) {
            roots.insert(0, scope.clone());
        }

        if roots.is_empty() {
            debug!(%selector, "no accordion roots found");
            return;
        }

        for root in &roots {
            let options = self.options.clone();
            root.listen(move |click: &Click<N>| {
                handle_click(&options, &click.current_target, &click.target);
            });
        }
        debug!(%selector, count = roots.len(), "accordion roots bound");
        self.roots.extend(roots);
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn roots(&self) -> &[N] {
        &self.roots
    }

    /// Runs the click logic for a click on `target` inside `root`.
    ///
    /// `None` when the click missed every button, or hit a button of a nested root.
    pub fn handle_click(&self, root: &N, target: &N) -> Option<Toggle<N>> {
        handle_click(&self.options, root, target)
    }
}

fn handle_click<N: Node>(options: &Options, root: &N, target: &N) -> Option<Toggle<N>> {
    let button = target.closest(&Selector::attr(options.btn_attr()))?;
    // buttons of a nested accordion belong to the innermost root
    let owner = button.closest_css(&options.selector).ok().flatten();
    if owner.as_ref() != Some(root) {
        return None;
    }
    let parent = target.closest(&Selector::attr(options.parent_attr()));
    let body = find_body(options, root, &button);

    let item = Item {
        button,
        parent,
        body,
    };
    let state = item.state(options).toggled();

    if state == ItemState::Open && options.close_others {
        let anchor = item.parent.as_ref().unwrap_or(&item.button);
        close_others(options, root, anchor);
    }
    item.render(state, options);

    debug!(?state, "accordion item toggled");
    Some(Toggle { item, state })
}

/// The body is correlated to its button by attribute value, not by position.
fn find_body<N: Node>(options: &Options, root: &N, button: &N) -> Option<N> {
    let key = button.attr(&options.btn_attr()).unwrap_or_default();
    root.query(&Selector::attr_eq(options.body_attr(), key))
}

fn close_others<N: Node>(options: &Options, root: &N, anchor: &N) {
    let buttons = Selector::attr(options.btn_attr());
    let items = Selector::attr(options.parent_attr());

    for neighbour in neighbour_items(anchor) {
        close(&neighbour, &options.active_class_parent);
        close(&neighbour, &options.active_class_btn);
        close(&neighbour, &options.active_class_body);

        if neighbour.matches(&buttons) {
            let item = Item {
                body: find_body(options, root, &neighbour),
                button: neighbour,
                parent: None,
            };
            item.render(ItemState::Closed, options);
            continue;
        }

        // only buttons owned by this neighbour, nested accordions keep their state
        for button in neighbour.query_all(&buttons) {
            if button.closest(&items).as_ref() != Some(&neighbour) {
                continue;
            }
            let item = Item {
                body: find_body(options, root, &button),
                button,
                parent: Some(neighbour.clone()),
            };
            item.render(ItemState::Closed, options);
        }
    }
}

pub fn open<N: Node>(element: &N, class: &str) {
    element.add_class(class);
}

pub fn close<N: Node>(element: &N, class: &str) {
    element.remove_class(class);
}

/// Following element siblings, nearest first.
pub fn next_items<N: Node>(element: &N) -> Vec<N> {
    iter::successors(element.next_sibling(), N::next_sibling).collect()
}

/// Preceding element siblings, nearest first.
pub fn prev_items<N: Node>(element: &N) -> Vec<N> {
    iter::successors(element.prev_sibling(), N::prev_sibling).collect()
}

pub fn neighbour_items<N: Node>(element: &N) -> Vec<N> {
    let mut items = prev_items(element);
    items.extend(next_items(element));
    items
}
