//! Run the compliance engine over a saved listing page.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use sf_core::page::Page;
use sf_core::store::{FileStorage, MemoryStorage, StorageBackend};
use sf_core::types::AttrValue;
use sf_engine::registry::ConfigurationRegistry;
use sf_engine::{
    ComplianceAction, DetailFragment, EnhancerConfig, FormState, HeadlessUi, HtmlPage, SearchEnhancer,
};

use crate::fetch::HttpFetcher;

pub const FILTER_MINIMUM_VIEWS: &str = "Minimum Views";
const ATTRIBUTE_VIEWS: &str = "Views";

pub struct CheckOptions {
    pub page: String,
    pub list_selector: String,
    pub item_selector: String,
    pub name_selector: String,
    pub link_selector: Option<String>,
    pub duration_selector: Option<String>,
    pub rating_selector: Option<String>,
    pub tag_template: Option<String>,
    pub settings_dir: Option<String>,
    pub prefix: String,
    pub restore: Option<String>,
    /// `Field Name=<json>` assignments applied after loading settings
    pub set: Vec<String>,
    pub save: bool,
    pub fetch_base: Option<String>,
    pub detail_selector: Option<String>,
    pub views_selector: Option<String>,
    pub request_delay: Duration,
}

impl CheckOptions {
    pub fn new(page: impl Into<String>, list_selector: &str, item_selector: &str, name_selector: &str) -> Self {
        Self {
            page: page.into(),
            list_selector: list_selector.to_string(),
            item_selector: item_selector.to_string(),
            name_selector: name_selector.to_string(),
            link_selector: None,
            duration_selector: None,
            rating_selector: None,
            tag_template: None,
            settings_dir: None,
            prefix: "sifter-".to_string(),
            restore: None,
            set: Vec::new(),
            save: false,
            fetch_base: None,
            detail_selector: None,
            views_selector: None,
            request_delay: Duration::from_millis(250),
        }
    }
}

#[derive(Debug)]
pub struct ItemReport {
    pub name: String,
    pub hidden: bool,
}

#[derive(Debug)]
pub struct CheckReport {
    pub items: Vec<ItemReport>,
    pub statistics: Vec<(String, u64)>,
    pub status: String,
}

impl CheckReport {
    pub fn hidden_count(&self) -> usize {
        self.items.iter().filter(|item| item.hidden).count()
    }

    pub fn statistic(&self, name: &str) -> u64 {
        self.statistics
            .iter()
            .find(|(statistic, _)| statistic == name)
            .map_or(0, |(_, value)| *value)
    }
}

pub fn run_check(opts: CheckOptions, verbose: bool) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    let report = runtime.block_on(check_page(&opts))?;

    println!("Checked '{}': {} items, {} hidden", opts.page, report.items.len(), report.hidden_count());
    for item in &report.items {
        if verbose || item.hidden {
            println!("  [{}] {}", if item.hidden { "hidden" } else { "shown " }, item.name);
        }
    }
    println!();
    println!("Statistics:");
    for (statistic, value) in &report.statistics {
        println!("  {:<24} {}", statistic, value);
    }
    if verbose {
        println!();
        println!("Status: {}", report.status);
    }
    Ok(())
}

pub async fn check_page(opts: &CheckOptions) -> Result<CheckReport, String> {
    let document = fs::read_to_string(&opts.page)
        .map_err(|e| format!("Failed to read '{}': {}", opts.page, e))?;
    let mut page = HtmlPage::parse(&document, &opts.list_selector, &opts.item_selector)
        .map_err(|e| e.to_string())?;

    let ui = HeadlessUi::new();
    let mut enhancer = build_enhancer(opts, ui.clone())?;
    let storage: Arc<dyn StorageBackend> = match &opts.settings_dir {
        Some(dir) => Arc::new(FileStorage::new(dir)),
        None => Arc::new(MemoryStorage::new()),
    };
    enhancer.init(&mut page, storage).map_err(|e| e.to_string())?;

    if let Some(path) = &opts.restore {
        let backup = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        if !enhancer.restore_settings(&mut page, &backup).map_err(|e| e.to_string())? {
            return Err(format!("Failed to restore '{}'", path));
        }
    }

    if !opts.set.is_empty() {
        for assignment in &opts.set {
            apply_assignment(enhancer.registry_mut(), assignment)?;
        }
        if opts.save {
            enhancer.registry_mut().save().map_err(|e| e.to_string())?;
        }
        enhancer.validate_compliance(&mut page, false);
    }

    enhancer.settle_deep_resolutions(&mut page).await;

    let items = page
        .all_items()
        .into_iter()
        .map(|item| ItemReport {
            name: page.text(item, &opts.name_selector).unwrap_or_default(),
            hidden: page.is_hidden(item),
        })
        .collect();
    let mut statistics: Vec<(String, u64)> = enhancer
        .statistics()
        .iter()
        .map(|(statistic, value)| (statistic.to_string(), value))
        .collect();
    statistics.sort();

    Ok(CheckReport {
        items,
        statistics,
        status: ui.state().status,
    })
}

fn build_enhancer(opts: &CheckOptions, ui: HeadlessUi) -> Result<SearchEnhancer, String> {
    let mut config = EnhancerConfig::new(opts.prefix.clone(), opts.name_selector.clone());
    if let Some(link) = &opts.link_selector {
        config.item_link_selector = link.clone();
    }
    config.item_deep_analysis_selector = opts.detail_selector.clone();
    config.request_delay = opts.request_delay;
    config.tag_selector_template = opts.tag_template.clone();

    let mut enhancer = SearchEnhancer::new(config, Box::new(FormState::new()), Box::new(ui));
    enhancer
        .add_item_text_sanitization_filter("Rewrite item names, one substitute=word1,word2 rule per line.")
        .add_item_whitelist_filter("Only show items containing these words.");

    if let Some(selector) = &opts.duration_selector {
        enhancer
            .add_item_duration_range_filter(selector.as_str(), None)
            .map_err(|e| e.to_string())?;
    }
    if let Some(selector) = &opts.rating_selector {
        enhancer
            .add_item_percentage_rating_range_filter(selector, None, None)
            .map_err(|e| e.to_string())?;
    }
    enhancer
        .add_item_tag_blacklist_filter(5, None)
        .map_err(|e| e.to_string())?
        .add_item_blacklist_filter("Hide items containing these words.")
        .map_err(|e| e.to_string())?
        .add_item_text_search_filter(None)
        .map_err(|e| e.to_string())?;

    if let Some(selector) = &opts.views_selector {
        enhancer.registry_mut().add_number_field(
            FILTER_MINIMUM_VIEWS,
            0,
            1_000_000_000,
            "Hide items with fewer views on their detail page.",
        );
        let selector = selector.clone();
        enhancer
            .resolver_mut()
            .add_deep_attribute(ATTRIBUTE_VIEWS, move |fragment: &DetailFragment| {
                fragment.text(&selector).and_then(|text| parse_count(&text)).map(AttrValue::Number)
            });
        enhancer
            .add_item_compliance_filter(
                FILTER_MINIMUM_VIEWS,
                Some(ComplianceAction::Attribute(ATTRIBUTE_VIEWS.to_string())),
                None,
            )
            .map_err(|e| e.to_string())?;
    }

    if let Some(base) = &opts.fetch_base {
        enhancer.set_fetcher(Arc::new(HttpFetcher::new(base, Duration::from_secs(10))?));
    }
    Ok(enhancer)
}

/// Apply `Field Name=<json>`. Text that is not JSON is taken as a string.
fn apply_assignment(registry: &mut ConfigurationRegistry, assignment: &str) -> Result<(), String> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Expected 'Field Name=value', got '{}'", assignment))?;
    let name = name.trim();
    let json = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.trim().to_string()));

    let current = registry.get_value(name).map_err(|e| e.to_string())?;
    let value = current
        .from_json_like(&json)
        .ok_or_else(|| format!("'{}' is not a valid value for \"{}\"", raw.trim(), name))?;
    registry.set_value(name, value).map_err(|e| e.to_string())
}

/// `"1,234 views"` -> 1234
fn parse_count(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
