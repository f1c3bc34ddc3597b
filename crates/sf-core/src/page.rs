//! Host page contract
//!
//! The engine never owns markup. A host exposes the item lists it found (via
//! the list and item selectors it was constructed with), answers selector
//! queries scoped to one item, and applies presentation changes.

use crate::types::{ItemId, ItemState, ListId};

pub trait Page {
    /// Item-list containers in document order.
    fn item_lists(&self) -> Vec<ListId>;

    /// Items currently inside `list`, in document order.
    fn items(&self, list: ListId) -> Vec<ItemId>;

    /// Whether the container itself also matches `selector`.
    fn list_matches(&self, list: ListId, selector: &str) -> bool;

    /// Whether the item is still attached to the page.
    fn contains(&self, item: ItemId) -> bool;

    /// Concatenated text of every descendant of `item` matching `selector`.
    fn text(&self, item: ItemId, selector: &str) -> Option<String>;

    /// Attribute `name` of the first descendant matching `selector`.
    fn attribute(&self, item: ItemId, selector: &str, name: &str) -> Option<String>;

    fn has_match(&self, item: ItemId, selector: &str) -> bool;

    /// Replace the text of the descendants matching `selector`.
    fn set_text(&mut self, item: ItemId, selector: &str, text: &str);

    /// Add `class` to the descendants matching `selector`.
    fn add_class(&mut self, item: ItemId, selector: &str, class: &str);

    fn state(&self, item: ItemId) -> ItemState;

    fn set_state(&mut self, item: ItemId, state: ItemState);

    fn show(&mut self, item: ItemId) {
        let state = self.state(item);
        self.set_state(item, state - ItemState::HIDDEN);
    }

    fn hide(&mut self, item: ItemId) {
        let state = self.state(item);
        self.set_state(item, state | ItemState::HIDDEN);
    }

    fn set_dimmed(&mut self, item: ItemId, dimmed: bool) {
        let mut state = self.state(item);
        state.set(ItemState::DIMMED, dimmed);
        self.set_state(item, state);
    }
}
