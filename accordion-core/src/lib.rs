#![warn(clippy::use_self)]

pub mod accordion;
pub mod node;
pub mod options;
pub mod selector;


pub use accordion::{Accordion, Item, ItemState, Toggle};
pub use node::{Click, Node};
pub use options::{OptionError, OptionValue, Options};
pub use selector::{Selector, SelectorError};
