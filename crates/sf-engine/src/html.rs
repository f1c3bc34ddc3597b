//! Static HTML host
//!
//! [`HtmlPage`] implements [`Page`] over a parsed document: every container
//! matching the list selector becomes an item list and every element matching
//! the item selector inside it becomes an item. Presentation changes are kept
//! beside the markup instead of being written into it.
//!
//! [`DetailFragment`] wraps a fetched item detail page for deep attributes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hasher;

use indexmap::IndexMap;
use log::warn;
use scraper::{ElementRef, Html, Selector};
use twox_hash::XxHash64;

use sf_core::error::ConfigurationError;
use sf_core::page::Page;
use sf_core::types::{ItemId, ItemState, ListId};
use sf_core::watcher::MutationRecord;

fn parse_selector(selector: &str) -> Result<Selector, ConfigurationError> {
    Selector::parse(selector)
        .map_err(|e| ConfigurationError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn first_element(html: &Html) -> Option<ElementRef<'_>> {
    html.root_element().children().find_map(ElementRef::wrap)
}

fn concat_text<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Option<String> {
    let mut found = false;
    let mut text = String::new();
    for element in elements {
        found = true;
        text.extend(element.text());
    }
    found.then_some(text)
}

/// Opening and closing tag of `element` without its children.
fn shell_markup(element: ElementRef<'_>) -> String {
    let name = element.value().name();
    let attributes: String = element
        .value()
        .attrs()
        .map(|(key, value)| format!(" {}=\"{}\"", key, value.replace('"', "&quot;")))
        .collect();
    format!("<{name}{attributes}></{name}>")
}

// =============================================================================
// HtmlPage
// =============================================================================

struct HtmlList {
    id: ListId,
    shell: Html,
    items: Vec<ItemId>,
}

struct HtmlItem {
    list: ListId,
    markup: Html,
    state: ItemState,
    text_overrides: HashMap<String, String>,
    classes: Vec<(String, String)>,
}

pub struct HtmlPage {
    lists: Vec<HtmlList>,
    items: IndexMap<ItemId, HtmlItem>,
    item_selector: Selector,
    selectors: RefCell<HashMap<String, Option<Selector>>>,
    ordinal: u64,
}

impl HtmlPage {
    pub fn parse(document: &str, list_selector: &str, item_selector: &str) -> Result<Self, ConfigurationError> {
        let list_selector = parse_selector(list_selector)?;
        let mut page = Self {
            lists: Vec::new(),
            items: IndexMap::new(),
            item_selector: parse_selector(item_selector)?,
            selectors: RefCell::new(HashMap::new()),
            ordinal: 0,
        };

        let document = Html::parse_document(document);
        for container in document.select(&list_selector) {
            let id = ListId(page.lists.len() as u32);
            page.lists.push(HtmlList {
                id,
                shell: Html::parse_fragment(&shell_markup(container)),
                items: Vec::new(),
            });
            let markups: Vec<String> = container.select(&page.item_selector).map(|el| el.html()).collect();
            for markup in markups {
                page.insert_item(id, markup);
            }
        }
        Ok(page)
    }

    /// Insert the items found in `markup` at the end of `list`.
    pub fn append_items(&mut self, list: ListId, markup: &str) -> MutationRecord {
        let fragment = Html::parse_fragment(markup);
        let markups: Vec<String> = fragment.select(&self.item_selector).map(|el| el.html()).collect();
        let added = markups
            .into_iter()
            .map(|markup| self.insert_item(list, markup))
            .collect();
        MutationRecord::added(list, added)
    }

    pub fn remove_item(&mut self, item: ItemId) -> Option<MutationRecord> {
        let removed = self.items.shift_remove(&item)?;
        if let Some(list) = self.lists.iter_mut().find(|list| list.id == removed.list) {
            list.items.retain(|existing| *existing != item);
        }
        Some(MutationRecord::removed(removed.list, vec![item]))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn all_items(&self) -> Vec<ItemId> {
        self.items.keys().copied().collect()
    }

    pub fn is_hidden(&self, item: ItemId) -> bool {
        self.state(item).contains(ItemState::HIDDEN)
    }

    /// `(selector, class)` pairs added to an item.
    pub fn added_classes(&self, item: ItemId) -> &[(String, String)] {
        self.items.get(&item).map(|entry| entry.classes.as_slice()).unwrap_or(&[])
    }

    fn insert_item(&mut self, list: ListId, markup: String) -> ItemId {
        let mut hasher = XxHash64::with_seed(self.ordinal);
        hasher.write(markup.as_bytes());
        self.ordinal += 1;
        let id = ItemId(hasher.finish());

        self.items.insert(
            id,
            HtmlItem {
                list,
                markup: Html::parse_fragment(&markup),
                state: ItemState::empty(),
                text_overrides: HashMap::new(),
                classes: Vec::new(),
            },
        );
        if let Some(entry) = self.lists.iter_mut().find(|entry| entry.id == list) {
            entry.items.push(id);
        }
        id
    }

    fn with_selector<R>(&self, selector: &str, f: impl FnOnce(&Selector) -> R) -> Option<R> {
        let mut cache = self.selectors.borrow_mut();
        let parsed = cache.entry(selector.to_string()).or_insert_with(|| {
            parse_selector(selector)
                .map_err(|e| warn!("{}", e))
                .ok()
        });
        parsed.as_ref().map(f)
    }
}

impl Page for HtmlPage {
    fn item_lists(&self) -> Vec<ListId> {
        self.lists.iter().map(|list| list.id).collect()
    }

    fn items(&self, list: ListId) -> Vec<ItemId> {
        self.lists
            .iter()
            .find(|entry| entry.id == list)
            .map(|entry| entry.items.clone())
            .unwrap_or_default()
    }

    fn list_matches(&self, list: ListId, selector: &str) -> bool {
        let Some(entry) = self.lists.iter().find(|entry| entry.id == list) else {
            return false;
        };
        self.with_selector(selector, |selector| {
            first_element(&entry.shell).is_some_and(|element| selector.matches(&element))
        })
        .unwrap_or(false)
    }

    fn contains(&self, item: ItemId) -> bool {
        self.items.contains_key(&item)
    }

    fn text(&self, item: ItemId, selector: &str) -> Option<String> {
        let entry = self.items.get(&item)?;
        if let Some(text) = entry.text_overrides.get(selector) {
            return Some(text.clone());
        }
        self.with_selector(selector, |selector| concat_text(entry.markup.select(selector)))
            .flatten()
    }

    fn attribute(&self, item: ItemId, selector: &str, name: &str) -> Option<String> {
        let entry = self.items.get(&item)?;
        self.with_selector(selector, |selector| {
            entry
                .markup
                .select(selector)
                .find_map(|element| element.value().attr(name).map(str::to_string))
        })
        .flatten()
    }

    fn has_match(&self, item: ItemId, selector: &str) -> bool {
        let Some(entry) = self.items.get(&item) else {
            return false;
        };
        self.with_selector(selector, |selector| entry.markup.select(selector).next().is_some())
            .unwrap_or(false)
    }

    fn set_text(&mut self, item: ItemId, selector: &str, text: &str) {
        if let Some(entry) = self.items.get_mut(&item) {
            entry.text_overrides.insert(selector.to_string(), text.to_string());
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

// =============================================================================
// Detail Fragment
// =============================================================================

/// Parsed detail page, optionally narrowed to the analysis selector.
pub struct DetailFragment {
    html: Html,
}

impl DetailFragment {
    pub fn parse(document: &str, analysis_selector: Option<&str>) -> Self {
        let html = Html::parse_document(document);
        let Some(selector) = analysis_selector else {
            return Self { html };
        };
        match parse_selector(selector) {
            Ok(selector) => {
                let markup: String = html.select(&selector).map(|el| el.html()).collect();
                Self {
                    html: Html::parse_fragment(&markup),
                }
            }
            Err(e) => {
                warn!("Analysing the whole detail page: {}", e);
                Self { html }
            }
        }
    }

    pub fn text(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        concat_text(self.html.select(&selector))
    }

    /// Text of each match, trimmed, empty ones dropped.
    pub fn texts(&self, selector: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect()
    }

    pub fn exists(&self, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|selector| self.html.select(&selector).next().is_some())
            .unwrap_or(false)
    }

    pub fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        self.html
            .select(&selector)
            .find_map(|element| element.value().attr(name).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
        <html><body>
          <ul class="videos paginated">
            <li class="video"><a class="title" href="/v/1">First</a><span class="duration">1:30</span></li>
            <li class="video"><a class="title" href="/v/2">Second</a><a class="tag" data-tag="x">x</a></li>
          </ul>
          <ul class="videos">
            <li class="video"><a class="title" href="/v/1">First</a></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_parse_lists_and_items() {
        let page = HtmlPage::parse(DOCUMENT, "ul.videos", "li.video").unwrap();
        let lists = page.item_lists();
        assert_eq!(lists.len(), 2);
        assert_eq!(page.items(lists[0]).len(), 2);
        assert_eq!(page.items(lists[1]).len(), 1);
        assert_eq!(page.item_count(), 3);
        assert!(page.list_matches(lists[0], ".paginated"));
        assert!(!page.list_matches(lists[1], ".paginated"));
    }

    #[test]
    fn test_identical_markup_gets_distinct_ids() {
        let page = HtmlPage::parse(DOCUMENT, "ul.videos", "li.video").unwrap();
        let lists = page.item_lists();
        assert_ne!(page.items(lists[0])[0], page.items(lists[1])[0]);
    }

    #[test]
    fn test_item_queries() {
        let page = HtmlPage::parse(DOCUMENT, "ul.videos", "li.video").unwrap();
        let items = page.items(page.item_lists()[0]);

        assert_eq!(page.text(items[0], ".title"), Some("First".to_string()));
        assert_eq!(page.text(items[1], ".duration"), None);
        assert_eq!(page.attribute(items[1], ".title", "href"), Some("/v/2".to_string()));
        assert!(page.has_match(items[1], "a[data-tag=\"x\"]"));
        assert!(!page.has_match(items[0], "a[data-tag=\"x\"]"));
        assert!(!page.has_match(items[0], "[[invalid"));
    }

    #[test]
    fn test_presentation_changes() {
        let mut page = HtmlPage::parse(DOCUMENT, "ul.videos", "li.video").unwrap();
        let item = page.items(page.item_lists()[0])[0];

        page.hide(item);
        page.set_text(item, ".title", "Renamed");
        page.add_class(item, ".tag", "highlight");

        assert!(page.is_hidden(item));
        assert_eq!(page.text(item, ".title"), Some("Renamed".to_string()));
        assert_eq!(page.added_classes(item), &[(".tag".to_string(), "highlight".to_string())]);
        page.show(item);
        assert!(!page.is_hidden(item));
    }

    #[test]
    fn test_append_and_remove_produce_records() {
        let mut page = HtmlPage::parse(DOCUMENT, "ul.videos", "li.video").unwrap();
        let list = page.item_lists()[1];

        let added = page.append_items(list, r#"<li class="video"><a class="title">New</a></li>"#);
        assert_eq!(added.target, list);
        assert_eq!(added.added.len(), 1);
        assert_eq!(page.items(list).len(), 2);

        let removed = page.remove_item(added.added[0]).unwrap();
        assert_eq!(removed.removed, added.added);
        assert!(!page.contains(added.added[0]));
        assert!(page.remove_item(added.added[0]).is_none());
    }

    #[test]
    fn test_detail_fragment_narrowing() {
        let document = r#"<div class="meta"><span class="views">10</span></div><span class="views">99</span>"#;
        let whole = DetailFragment::parse(document, None);
        let narrowed = DetailFragment::parse(document, Some(".meta"));

        assert_eq!(whole.texts(".views"), vec!["10".to_string(), "99".to_string()]);
        assert_eq!(narrowed.text(".views"), Some("10".to_string()));
        assert!(!narrowed.exists(".missing"));
    }
}
