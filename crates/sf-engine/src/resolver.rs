//! Item attribute resolution
//!
//! Cheap attributes are computed from the item markup once, on the item's
//! first compliance pass, and cached in a side table keyed by [`ItemId`].
//! Deep attributes need the item's detail page: the first lookup of a missing
//! attribute schedules one background fetch, staggered by the number of
//! fetches already scheduled in the current compliance run. Results come back
//! over a channel and are applied by the owner with [`AttributeResolver::apply`],
//! after which the item should be re-evaluated.
//!
//! Releasing an item drops its cache entry and aborts its pending fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use sf_core::error::TransientIoError;
use sf_core::page::Page;
use sf_core::text::attribute_key;
use sf_core::types::{AttrValue, ItemId};

use crate::html::DetailFragment;

/// Computes an attribute from the item markup.
pub type AttributeFn = Box<dyn Fn(&dyn Page, ItemId) -> Option<AttrValue>>;

/// Computes an attribute from the item's detail page.
pub type DeepAttributeFn = Arc<dyn Fn(&DetailFragment) -> Option<AttrValue> + Send + Sync>;

/// Retrieves the detail page behind an item link.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, TransientIoError>;
}

/// Outcome of one background detail fetch.
#[derive(Debug)]
pub struct DeepResolution {
    pub item: ItemId,
    pub outcome: Result<Vec<(String, Option<AttrValue>)>, TransientIoError>,
}

#[derive(Debug)]
enum DeepState {
    Pending(JoinHandle<()>),
    Resolved,
    /// Never retried for the lifetime of the item
    Failed,
}

#[derive(Debug, Default)]
struct AttributeBag {
    values: HashMap<String, Option<AttrValue>>,
    deep: Option<DeepState>,
}

pub struct AttributeResolver {
    item_link_selector: String,
    deep_analysis_selector: Option<String>,
    request_delay: Duration,
    attributes: IndexMap<String, AttributeFn>,
    deep_attributes: Arc<Vec<(String, DeepAttributeFn)>>,
    fetcher: Option<Arc<dyn DetailFetcher>>,
    bags: HashMap<ItemId, AttributeBag>,
    request_iteration: u32,
    sender: mpsc::UnboundedSender<DeepResolution>,
    receiver: mpsc::UnboundedReceiver<DeepResolution>,
}

impl AttributeResolver {
    pub fn new(
        item_link_selector: impl Into<String>,
        deep_analysis_selector: Option<String>,
        request_delay: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            item_link_selector: item_link_selector.into(),
            deep_analysis_selector,
            request_delay,
            attributes: IndexMap::new(),
            deep_attributes: Arc::new(Vec::new()),
            fetcher: None,
            bags: HashMap::new(),
            request_iteration: 1,
            sender,
            receiver,
        }
    }

    pub fn set_fetcher(&mut self, fetcher: Arc<dyn DetailFetcher>) -> &mut Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn add_attribute(
        &mut self,
        name: &str,
        resolver: impl Fn(&dyn Page, ItemId) -> Option<AttrValue> + 'static,
    ) -> &mut Self {
        self.attributes.insert(attribute_key(name), Box::new(resolver));
        self
    }

    pub fn add_deep_attribute(
        &mut self,
        name: &str,
        resolver: impl Fn(&DetailFragment) -> Option<AttrValue> + Send + Sync + 'static,
    ) -> &mut Self {
        let key = attribute_key(name);
        let resolver: DeepAttributeFn = Arc::new(resolver);
        let mut deep_attributes: Vec<(String, DeepAttributeFn)> = self
            .deep_attributes
            .iter()
            .filter(|(existing, _)| *existing != key)
            .cloned()
            .collect();
        deep_attributes.push((key, resolver));
        self.deep_attributes = Arc::new(deep_attributes);
        self
    }

    pub fn has_deep_attributes(&self) -> bool {
        !self.deep_attributes.is_empty()
    }

    /// Compute every cheap attribute for `item`, replacing any cached bag.
    pub fn resolve_attributes(&mut self, page: &dyn Page, item: ItemId) {
        let mut bag = AttributeBag::default();
        for (key, resolver) in &self.attributes {
            bag.values.insert(key.clone(), resolver(page, item));
        }
        if let Some(previous) = self.bags.insert(item, bag) {
            abort_pending(previous);
        }
    }

    /// Cached attribute value. A miss on an item with a bag schedules the
    /// deep fetch once; the value shows up after the resolution is applied.
    pub fn get(&mut self, page: &dyn Page, item: ItemId, name: &str) -> Option<AttrValue> {
        let key = attribute_key(name);
        let bag = self.bags.get(&item)?;
        if let Some(value) = bag.values.get(&key) {
            return value.clone();
        }
        if bag.deep.is_none() && self.has_deep_attributes() {
            self.load_deep_attributes(page, item);
        }
        None
    }

    pub fn set(&mut self, item: ItemId, name: &str, value: AttrValue) {
        if let Some(bag) = self.bags.get_mut(&item) {
            bag.values.insert(attribute_key(name), Some(value));
        }
    }

    pub fn is_tracked(&self, item: ItemId) -> bool {
        self.bags.contains_key(&item)
    }

    /// Forget `item` and cancel its pending fetch.
    pub fn release(&mut self, item: ItemId) -> bool {
        match self.bags.remove(&item) {
            Some(bag) => {
                abort_pending(bag);
                true
            }
            None => false,
        }
    }

    /// Reset the fetch stagger at the end of a compliance run.
    pub fn complete_resolution_run(&mut self) {
        self.request_iteration = 1;
    }

    /// Fetches scheduled and not yet finished.
    pub fn pending_deep_resolutions(&self) -> usize {
        self.bags
            .values()
            .filter(|bag| matches!(&bag.deep, Some(DeepState::Pending(handle)) if !handle.is_finished()))
            .count()
    }

    pub fn try_next_resolution(&mut self) -> Option<DeepResolution> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next finished fetch; `None` once nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<DeepResolution> {
        if let Some(resolution) = self.try_next_resolution() {
            return Some(resolution);
        }
        if self.pending_deep_resolutions() == 0 {
            return None;
        }
        self.receiver.recv().await
    }

    /// Merge a finished fetch into the item's bag. Returns the item when new
    /// values were stored and it should be re-evaluated.
    pub fn apply(&mut self, resolution: DeepResolution) -> Option<ItemId> {
        let Some(bag) = self.bags.get_mut(&resolution.item) else {
            debug!("Dropping deep attributes of released {}", resolution.item);
            return None;
        };
        match resolution.outcome {
            Ok(values) => {
                bag.values.extend(values);
                bag.deep = Some(DeepState::Resolved);
                Some(resolution.item)
            }
            Err(e) => {
                warn!("Deep attribute loading failed for {}: {}", resolution.item, e);
                bag.deep = Some(DeepState::Failed);
                None
            }
        }
    }

    fn load_deep_attributes(&mut self, page: &dyn Page, item: ItemId) {
        let state = self.spawn_fetch(page, item);
        if let Some(bag) = self.bags.get_mut(&item) {
            bag.deep = Some(state);
        }
    }

    fn spawn_fetch(&mut self, page: &dyn Page, item: ItemId) -> DeepState {
        let Some(url) = page.attribute(item, &self.item_link_selector, "href") else {
            debug!("{} has no detail link, skipping deep attributes", item);
            return DeepState::Failed;
        };
        let Some(fetcher) = self.fetcher.clone() else {
            warn!("Deep attributes requested for {} without a detail fetcher", item);
            return DeepState::Failed;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot schedule deep attributes for {}: {}", item, e);
                return DeepState::Failed;
            }
        };

        let delay = self.request_delay * self.request_iteration;
        self.request_iteration += 1;
        debug!("Fetching {} for {} in {:?}", url, item, delay);

        let resolvers = Arc::clone(&self.deep_attributes);
        let selector = self.deep_analysis_selector.clone();
        let sender = self.sender.clone();

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let outcome = fetcher
                .fetch(&url)
                .await
                .map(|html| resolve_deep_attributes(&html, selector.as_deref(), &resolvers));
            // The receiver lives as long as the resolver; a send error means
            // the resolver is gone and nobody wants the result.
            let _ = sender.send(DeepResolution { item, outcome });
        });

        DeepState::Pending(handle)
    }
}

impl Drop for AttributeResolver {
    fn drop(&mut self) {
        for (_, bag) in self.bags.drain() {
            abort_pending(bag);
        }
    }
}

fn abort_pending(bag: AttributeBag) {
    if let Some(DeepState::Pending(handle)) = bag.deep {
        handle.abort();
    }
}

fn resolve_deep_attributes(
    html: &str,
    selector: Option<&str>,
    resolvers: &[(String, DeepAttributeFn)],
) -> Vec<(String, Option<AttrValue>)> {
    let fragment = DetailFragment::parse(html, selector);
    resolvers
        .iter()
        .map(|(key, resolver)| (key.clone(), resolver(&fragment)))
        .collect()
}
