//! In-memory page and fetcher doubles for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use sf_core::error::TransientIoError;
use sf_core::page::Page;
use sf_core::types::{ItemId, ItemState, ListId};
use sf_core::watcher::MutationRecord;

use crate::resolver::DetailFetcher;

/// Item described by the answers it gives to selector queries.
#[derive(Debug, Default, Clone)]
pub struct MemoryItem {
    texts: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    matches: HashSet<String>,
    pub state: ItemState,
    pub classes: Vec<(String, String)>,
}

impl MemoryItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self.matches.insert(selector.to_string());
        self
    }

    pub fn attr(mut self, selector: &str, name: &str, value: &str) -> Self {
        self.attributes
            .insert((selector.to_string(), name.to_string()), value.to_string());
        self.matches.insert(selector.to_string());
        self
    }

    pub fn matches(mut self, selector: &str) -> Self {
        self.matches.insert(selector.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub struct MemoryPage {
    lists: Vec<(ListId, HashSet<String>, Vec<ItemId>)>,
    items: HashMap<ItemId, MemoryItem>,
    next_item: u64,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a list container matching `selectors`.
    pub fn add_list(&mut self, selectors: &[&str]) -> ListId {
        let id = ListId(self.lists.len() as u32);
        let selectors = selectors.iter().map(|s| s.to_string()).collect();
        self.lists.push((id, selectors, Vec::new()));
        id
    }

    pub fn add_item(&mut self, list: ListId, item: MemoryItem) -> ItemId {
        self.next_item += 1;
        let id = ItemId(self.next_item);
        self.items.insert(id, item);
        if let Some((_, _, items)) = self.lists.iter_mut().find(|(existing, _, _)| *existing == list) {
            items.push(id);
        }
        id
    }

    pub fn append(&mut self, list: ListId, items: Vec<MemoryItem>) -> MutationRecord {
        let added = items.into_iter().map(|item| self.add_item(list, item)).collect();
        MutationRecord::added(list, added)
    }

    pub fn remove(&mut self, list: ListId, item: ItemId) -> MutationRecord {
        self.items.remove(&item);
        if let Some((_, _, items)) = self.lists.iter_mut().find(|(existing, _, _)| *existing == list) {
            items.retain(|existing| *existing != item);
        }
        MutationRecord::removed(list, vec![item])
    }

    pub fn item(&self, item: ItemId) -> &MemoryItem {
        &self.items[&item]
    }

    pub fn is_hidden(&self, item: ItemId) -> bool {
        self.state(item).contains(ItemState::HIDDEN)
    }
}

impl Page for MemoryPage {
    fn item_lists(&self) -> Vec<ListId> {
        self.lists.iter().map(|(id, _, _)| *id).collect()
    }

    fn items(&self, list: ListId) -> Vec<ItemId> {
        self.lists
            .iter()
            .find(|(id, _, _)| *id == list)
            .map(|(_, _, items)| items.clone())
            .unwrap_or_default()
    }

    fn list_matches(&self, list: ListId, selector: &str) -> bool {
        self.lists
            .iter()
            .any(|(id, selectors, _)| *id == list && selectors.contains(selector))
    }

    fn contains(&self, item: ItemId) -> bool {
        self.items.contains_key(&item)
    }

    fn text(&self, item: ItemId, selector: &str) -> Option<String> {
        self.items.get(&item)?.texts.get(selector).cloned()
    }

    fn attribute(&self, item: ItemId, selector: &str, name: &str) -> Option<String> {
        self.items
            .get(&item)?
            .attributes
            .get(&(selector.to_string(), name.to_string()))
            .cloned()
    }

    fn has_match(&self, item: ItemId, selector: &str) -> bool {
        self.items
            .get(&item)
            .is_some_and(|entry| entry.matches.contains(selector))
    }

    fn set_text(&mut self, item: ItemId, selector: &str, text: &str) {
        if let Some(entry) = self.items.get_mut(&item) {
            entry.texts.insert(selector.to_string(), text.to_string());
            entry.state |= ItemState::SANITIZED;
        }
    }

    fn add_class(&mut self, item: ItemId, selector: &str, class: &str) {
        if let Some(entry) = self.items.get_mut(&item) {
            entry.classes.push((selector.to_string(), class.to_string()));
        }
    }

    fn state(&self, item: ItemId) -> ItemState {
        self.items.get(&item).map(|entry| entry.state).unwrap_or_default()
    }

    fn set_state(&mut self, item: ItemId, state: ItemState) {
        if let Some(entry) = self.items.get_mut(&item) {
            entry.state = state;
        }
    }
}

/// Fetcher returning one canned body and recording requested urls.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    body: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetailFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, TransientIoError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.body.clone().ok_or_else(|| TransientIoError::Fetch {
            url: url.to_string(),
            reason: "503 Service Unavailable".to_string(),
        })
    }
}
