//! Compliance engine
//!
//! [`SearchEnhancer`] owns the registry, the attribute resolver, the filter
//! chain and the statistics of one script instance. Each compliance pass over
//! an item runs the disable-all switch, the whitelist, the before-compliance
//! gates and then the filter chain in registration order, stopping at the first
//! failing filter. Only that filter's statistic is incremented.
//!
//! The first pass over an item also sanitizes its name, resolves its
//! attributes and runs the first-hit hooks. Settings changes re-run compliance
//! over every item but never the first-hit work.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use sf_compiler::{selector_from_template, TagSelectorGenerator};
use sf_core::error::{ConfigurationError, Error, Result, UserInputError};
use sf_core::page::Page;
use sf_core::stats::StatisticsRecorder;
use sf_core::store::StorageBackend;
use sf_core::text::sanitize;
use sf_core::types::{AttrValue, ItemId, ListId};
use sf_core::watcher::{MutationHandler, MutationRecord, MutationWatcher};

use crate::filter::{derive_compliance_action, ComplianceAction, ComplianceFilter, ItemContext, ValidationFn};
use crate::registry::{is_configured, ConfigurationRegistry, FieldView};
use crate::resolver::{AttributeResolver, DetailFetcher};
use crate::ui::{Clipboard, EnhancerUi, SettingsInterface};

pub const ITEM_NAME: &str = "name";
pub const ITEM_PROCESSED_ONCE: &str = "processedOnce";

pub const OPTION_ALWAYS_SHOW_SETTINGS_PANE: &str = "Always Show Settings Pane";
pub const OPTION_DISABLE_COMPLIANCE_VALIDATION: &str = "Disable All Filters";

pub const CONFIG_PAGINATOR_LIMIT: &str = "Pagination Limit";
pub const CONFIG_PAGINATOR_THRESHOLD: &str = "Pagination Threshold";
pub const FILTER_TEXT_SANITIZATION: &str = "Text Sanitization Rules";
pub const FILTER_TEXT_WHITELIST: &str = "Whitelist";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct EnhancerConfig {
    /// Prefix for storage keys and statistic label ids
    pub script_prefix: String,
    pub item_name_selector: String,
    /// Link to the item's detail page (deep attributes)
    pub item_link_selector: String,
    /// Part of the detail page deep attributes are read from
    pub item_deep_analysis_selector: Option<String>,
    /// Base stagger between deep fetches
    pub request_delay: Duration,
    pub is_user_logged_in: bool,
    /// Selector template for tags, `{tag}` is replaced by the tag name
    pub tag_selector_template: Option<String>,
}

impl EnhancerConfig {
    pub fn new(script_prefix: impl Into<String>, item_name_selector: impl Into<String>) -> Self {
        let item_name_selector = item_name_selector.into();
        Self {
            script_prefix: script_prefix.into(),
            item_link_selector: item_name_selector.clone(),
            item_name_selector,
            item_deep_analysis_selector: None,
            request_delay: Duration::ZERO,
            is_user_logged_in: false,
            tag_selector_template: None,
        }
    }

    fn tag_selector_generator(&self) -> Option<TagSelectorGenerator> {
        let template = self.tag_selector_template.clone()?;
        Some(Arc::new(move |tag: &str| selector_from_template(&template, tag)))
    }
}

/// Loads more results into a paginated list until a threshold is met.
pub trait Paginator {
    /// Lists matching this selector are paginated.
    fn item_list_selector(&self) -> &str;

    fn initialize(&mut self, _page: &mut dyn Page) {}

    /// Ensure `threshold` visible results, loading at most `limit` pages.
    fn run(&mut self, page: &mut dyn Page, threshold: i64, limit: i64);
}

// =============================================================================
// Hooks
// =============================================================================

pub type ItemHook = Box<dyn Fn(&mut ItemContext<'_>)>;
pub type ItemGate = Box<dyn Fn(&mut ItemContext<'_>) -> bool>;
pub type RunHook = Box<dyn FnMut(&ConfigurationRegistry, &StatisticsRecorder)>;
pub type UiBuildHook = Box<dyn FnMut(&mut ConfigurationRegistry) -> std::result::Result<(), ConfigurationError>>;
pub type VisibilityHook = Box<dyn Fn(&mut dyn Page, ItemId)>;
pub type InitGate = Box<dyn Fn(&dyn Page) -> bool>;

struct EnhancerHooks {
    validate_init: Option<InitGate>,
    before_ui_build: Vec<UiBuildHook>,
    after_ui_build: Vec<UiBuildHook>,
    before_compliance: Vec<ItemGate>,
    first_hit_before_compliance: Vec<ItemHook>,
    first_hit_after_compliance: Vec<ItemHook>,
    after_compliance_run: Vec<RunHook>,
    after_initialization: Vec<RunHook>,
    on_item_show: VisibilityHook,
    on_item_hide: VisibilityHook,
}

impl Default for EnhancerHooks {
    fn default() -> Self {
        Self {
            validate_init: None,
            before_ui_build: Vec::new(),
            after_ui_build: Vec::new(),
            before_compliance: Vec::new(),
            first_hit_before_compliance: Vec::new(),
            first_hit_after_compliance: Vec::new(),
            after_compliance_run: Vec::new(),
            after_initialization: Vec::new(),
            on_item_show: Box::new(|page: &mut dyn Page, item: ItemId| page.show(item)),
            on_item_hide: Box::new(|page: &mut dyn Page, item: ItemId| page.hide(item)),
        }
    }
}

/// Custom activation test for [`SearchEnhancer::perform_operation`]; receives
/// the default test for the field as its second argument.
pub type OperationValidation<'v> = &'v dyn Fn(&FieldView<'_>, &dyn Fn(&FieldView<'_>) -> bool) -> bool;

struct ListWatcher {
    watcher: MutationWatcher,
    paginated: bool,
}

// =============================================================================
// Engine
// =============================================================================

pub struct SearchEnhancer {
    config: EnhancerConfig,
    registry: ConfigurationRegistry,
    resolver: AttributeResolver,
    statistics: StatisticsRecorder,
    filters: Vec<ComplianceFilter>,
    watchers: Vec<ListWatcher>,
    paginator: Option<Box<dyn Paginator>>,
    sanitization_enabled: bool,
    hooks: EnhancerHooks,
    ui: Box<dyn EnhancerUi>,
}

impl SearchEnhancer {
    pub fn new(config: EnhancerConfig, interface: Box<dyn SettingsInterface>, ui: Box<dyn EnhancerUi>) -> Self {
        let mut registry = ConfigurationRegistry::new(interface, config.tag_selector_generator());
        registry
            .add_flag_field(OPTION_DISABLE_COMPLIANCE_VALIDATION, "Disables all search filters.")
            .add_flag_field(OPTION_ALWAYS_SHOW_SETTINGS_PANE, "Always show configuration interface.");

        let resolver = AttributeResolver::new(
            config.item_link_selector.clone(),
            config.item_deep_analysis_selector.clone(),
            config.request_delay,
        );

        Self {
            statistics: StatisticsRecorder::new(config.script_prefix.clone()),
            config,
            registry,
            resolver,
            filters: Vec::new(),
            watchers: Vec::new(),
            paginator: None,
            sanitization_enabled: false,
            hooks: EnhancerHooks::default(),
            ui,
        }
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConfigurationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConfigurationRegistry {
        &mut self.registry
    }

    pub fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut AttributeResolver {
        &mut self.resolver
    }

    pub fn statistics(&self) -> &StatisticsRecorder {
        &self.statistics
    }

    pub fn ui(&self) -> &dyn EnhancerUi {
        self.ui.as_ref()
    }

    pub fn filter_keys(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(ComplianceFilter::config_key)
    }

    pub fn is_user_logged_in(&self) -> bool {
        self.config.is_user_logged_in
    }

    pub fn set_fetcher(&mut self, fetcher: Arc<dyn DetailFetcher>) -> &mut Self {
        self.resolver.set_fetcher(fetcher);
        self
    }

    pub(crate) fn enable_sanitization(&mut self) {
        self.sanitization_enabled = true;
    }

    pub(crate) fn set_paginator(&mut self, paginator: Box<dyn Paginator>) {
        self.paginator = Some(paginator);
    }

    // -------------------------------------------------------------------------
    // Hook registration
    // -------------------------------------------------------------------------

    pub fn on_validate_init(&mut self, gate: impl Fn(&dyn Page) -> bool + 'static) -> &mut Self {
        self.hooks.validate_init = Some(Box::new(gate));
        self
    }

    /// Runs before controls are created; hosts bind fields here.
    pub fn on_ui_build(
        &mut self,
        hook: impl FnMut(&mut ConfigurationRegistry) -> std::result::Result<(), ConfigurationError> + 'static,
    ) -> &mut Self {
        self.hooks.before_ui_build.push(Box::new(hook));
        self
    }

    pub fn on_ui_built(
        &mut self,
        hook: impl FnMut(&mut ConfigurationRegistry) -> std::result::Result<(), ConfigurationError> + 'static,
    ) -> &mut Self {
        self.hooks.after_ui_build.push(Box::new(hook));
        self
    }

    /// A gate returning `false` lets the item through without running filters.
    pub fn on_before_compliance(&mut self, gate: impl Fn(&mut ItemContext<'_>) -> bool + 'static) -> &mut Self {
        self.hooks.before_compliance.push(Box::new(gate));
        self
    }

    pub fn on_first_hit_before_compliance(&mut self, hook: impl Fn(&mut ItemContext<'_>) + 'static) -> &mut Self {
        self.hooks.first_hit_before_compliance.push(Box::new(hook));
        self
    }

    pub fn on_first_hit_after_compliance(&mut self, hook: impl Fn(&mut ItemContext<'_>) + 'static) -> &mut Self {
        self.hooks.first_hit_after_compliance.push(Box::new(hook));
        self
    }

    pub fn on_after_compliance_run(
        &mut self,
        hook: impl FnMut(&ConfigurationRegistry, &StatisticsRecorder) + 'static,
    ) -> &mut Self {
        self.hooks.after_compliance_run.push(Box::new(hook));
        self
    }

    pub fn on_after_initialization(
        &mut self,
        hook: impl FnMut(&ConfigurationRegistry, &StatisticsRecorder) + 'static,
    ) -> &mut Self {
        self.hooks.after_initialization.push(Box::new(hook));
        self
    }

    pub fn on_item_show(&mut self, hook: impl Fn(&mut dyn Page, ItemId) + 'static) -> &mut Self {
        self.hooks.on_item_show = Box::new(hook);
        self
    }

    pub fn on_item_hide(&mut self, hook: impl Fn(&mut dyn Page, ItemId) + 'static) -> &mut Self {
        self.hooks.on_item_hide = Box::new(hook);
        self
    }

    // -------------------------------------------------------------------------
    // Filter registration
    // -------------------------------------------------------------------------

    /// Append a filter over an existing field. Without an action the field is
    /// compared against the attribute named after the field; without a
    /// validation the kind's default activation test is used.
    pub fn add_item_compliance_filter(
        &mut self,
        config_key: &str,
        action: Option<ComplianceAction>,
        validation: Option<ValidationFn>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        let kind = self.registry.get_field_or_fail(config_key)?.kind().clone();
        let comply = match action.unwrap_or_else(|| ComplianceAction::Attribute(config_key.to_string())) {
            ComplianceAction::Attribute(attribute) => derive_compliance_action(config_key, &kind, &attribute)?,
            ComplianceAction::Custom(comply) => comply,
        };
        let validate = match validation {
            Some(validate) => validate,
            None => self.registry.generate_validation_callback(config_key)?,
        };
        debug!("Registered {} filter \"{}\"", kind.name(), config_key);
        self.filters.push(ComplianceFilter::new(config_key, validate, comply));
        Ok(self)
    }

    pub fn add_item_complex_compliance_filter(
        &mut self,
        config_key: &str,
        validation: ValidationFn,
        action: ComplianceAction,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.add_item_compliance_filter(config_key, Some(action), Some(validation))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Load settings, bind controls and run the first compliance pass.
    /// Returns `false` when the validate-init gate declined this page.
    pub fn init(&mut self, page: &mut dyn Page, storage: Arc<dyn StorageBackend>) -> Result<bool> {
        if let Some(gate) = &self.hooks.validate_init {
            if !gate(&*page) {
                info!("Page declined by the init gate");
                return Ok(false);
            }
        }

        self.registry.initialize(&self.config.script_prefix, storage)?;

        let name_selector = self.config.item_name_selector.clone();
        self.resolver
            .add_attribute(ITEM_NAME, move |page: &dyn Page, item: ItemId| {
                Some(AttrValue::Text(page.text(item, &name_selector).unwrap_or_default()))
            })
            .add_attribute(ITEM_PROCESSED_ONCE, |_: &dyn Page, _: ItemId| Some(AttrValue::Flag(false)));

        if let Some(paginator) = self.paginator.as_mut() {
            paginator.initialize(page);
        }

        for hook in &mut self.hooks.before_ui_build {
            hook(&mut self.registry)?;
        }
        self.ui
            .embed_settings_pane(self.registry.flag(OPTION_ALWAYS_SHOW_SETTINGS_PANE));
        for hook in &mut self.hooks.after_ui_build {
            hook(&mut self.registry)?;
        }
        self.registry.update_interface();

        self.validate_compliance(page, true);
        self.ui.update_status("Initial run completed.", false);

        for hook in &mut self.hooks.after_initialization {
            hook(&self.registry, &self.statistics);
        }
        Ok(true)
    }

    /// Run compliance over every item list.
    ///
    /// The first run attaches a watcher to each list; later runs reset the
    /// statistics and re-evaluate every item without first-hit work.
    pub fn validate_compliance(&mut self, page: &mut dyn Page, first_run: bool) {
        let lists = page.item_lists();
        if first_run {
            for list in lists {
                let paginated = self
                    .paginator
                    .as_ref()
                    .is_some_and(|paginator| page.list_matches(list, paginator.item_list_selector()));
                self.watchers.retain(|existing| existing.watcher.target() != Some(list));
                self.watchers.push(ListWatcher {
                    watcher: MutationWatcher::create().observe(list),
                    paginated,
                });
                let items = page.items(list);
                self.comply_items(page, &items);
            }
        } else {
            self.statistics.reset();
            for list in lists {
                let items = page.items(list);
                self.comply_items(page, &items);
            }
        }

        self.run_paginator(page);
        for hook in &mut self.hooks.after_compliance_run {
            hook(&self.registry, &self.statistics);
        }
        self.resolver.complete_resolution_run();
        debug!("Compliance run completed, {} items failed", self.statistics.total());
    }

    /// Run the item pipeline over `items`, doing first-hit work where needed.
    pub fn comply_items(&mut self, page: &mut dyn Page, items: &[ItemId]) {
        for &item in items {
            page.set_dimmed(item, true);
        }

        for &item in items {
            let first_hit = self.resolver.get(&*page, item, ITEM_PROCESSED_ONCE).is_none();
            if first_hit {
                if self.sanitization_enabled {
                    self.sanitize_item_name(page, item);
                }
                self.resolver.resolve_attributes(&*page, item);
                for hook in &self.hooks.first_hit_before_compliance {
                    hook(&mut ItemContext {
                        page: &mut *page,
                        item,
                        settings: &self.registry,
                        attributes: &mut self.resolver,
                    });
                }
            }

            self.comply_item(page, item);

            let processed = self
                .resolver
                .get(&*page, item, ITEM_PROCESSED_ONCE)
                .is_some_and(|value| value.is_truthy());
            if !processed {
                for hook in &self.hooks.first_hit_after_compliance {
                    hook(&mut ItemContext {
                        page: &mut *page,
                        item,
                        settings: &self.registry,
                        attributes: &mut self.resolver,
                    });
                }
                self.resolver.set(item, ITEM_PROCESSED_ONCE, AttrValue::Flag(true));
            }
        }

        self.statistics.update_ui(self.ui.as_mut());
    }

    /// Decide visibility of one item. Returns whether it complies.
    pub fn comply_item(&mut self, page: &mut dyn Page, item: ItemId) -> bool {
        let mut complies = true;

        if self.registry.flag(OPTION_DISABLE_COMPLIANCE_VALIDATION) {
            debug!("Filters disabled, showing {}", item);
        } else if !self.validate_item_whitelist(page, item) {
            complies = false;
        } else if self.run_before_compliance(page, item) {
            for filter in &self.filters {
                let Some(field) = self.registry.get_field(filter.config_key()) else {
                    continue;
                };
                let view = field.view();
                if !filter.is_active(&view, &self.registry) {
                    continue;
                }
                let mut context = ItemContext {
                    page: &mut *page,
                    item,
                    settings: &self.registry,
                    attributes: &mut self.resolver,
                };
                complies = filter.complies(&mut context, &view);
                self.statistics.record(filter.config_key(), complies, 1);
                if !complies {
                    break;
                }
            }
        }

        if complies {
            (self.hooks.on_item_show)(page, item);
        } else {
            (self.hooks.on_item_hide)(page, item);
        }
        page.set_dimmed(item, false);
        complies
    }

    /// Whitelist check, counted under the whitelist statistic. Passes when
    /// no whitelist field exists or it holds no rules.
    fn validate_item_whitelist(&mut self, page: &dyn Page, item: ItemId) -> bool {
        let Some(field) = self.registry.get_field(FILTER_TEXT_WHITELIST) else {
            return true;
        };
        let passed = match field.view().pattern() {
            Some(pattern) if field.value().rule_count() > 0 => self
                .resolver
                .get(page, item, ITEM_NAME)
                .as_ref()
                .and_then(AttrValue::as_text)
                .is_some_and(|name| pattern.is_match(name)),
            _ => true,
        };
        self.statistics.record(FILTER_TEXT_WHITELIST, passed, 1);
        passed
    }

    fn run_before_compliance(&mut self, page: &mut dyn Page, item: ItemId) -> bool {
        for gate in &self.hooks.before_compliance {
            let mut context = ItemContext {
                page: &mut *page,
                item,
                settings: &self.registry,
                attributes: &mut self.resolver,
            };
            if !gate(&mut context) {
                return false;
            }
        }
        true
    }

    fn sanitize_item_name(&mut self, page: &mut dyn Page, item: ItemId) {
        let Some(field) = self.registry.get_field(FILTER_TEXT_SANITIZATION) else {
            return;
        };
        let substitutions = field.view().substitutions();
        if substitutions.is_empty() {
            return;
        }
        let selector = &self.config.item_name_selector;
        if let Some(name) = page.text(item, selector) {
            let sanitized = sanitize(&name, substitutions);
            if sanitized != name {
                page.set_text(item, selector, &sanitized);
            }
        }
    }

    fn run_paginator(&mut self, page: &mut dyn Page) {
        let threshold = self.registry.number(CONFIG_PAGINATOR_THRESHOLD);
        let limit = self.registry.number(CONFIG_PAGINATOR_LIMIT);
        if let Some(paginator) = self.paginator.as_mut() {
            paginator.run(page, threshold, limit);
        }
    }

    // -------------------------------------------------------------------------
    // Mutations and deep attributes
    // -------------------------------------------------------------------------

    /// Deliver child-list changes to the watchers of their lists.
    pub fn handle_mutations(&mut self, page: &mut dyn Page, records: &[MutationRecord]) {
        for record in records {
            let Some(entry) = self
                .watchers
                .iter()
                .find(|entry| entry.watcher.target() == Some(record.target))
            else {
                debug!("No watcher on {}, dropping mutation", record.target);
                continue;
            };
            let watcher = entry.watcher.clone();
            let paginated = entry.paginated;
            let mut dispatch = MutationDispatch {
                paginated,
                enhancer: self,
                page: &mut *page,
            };
            watcher.deliver(record, &mut dispatch);
        }
    }

    pub fn pause_watchers(&mut self) {
        for entry in &mut self.watchers {
            entry.watcher.pause();
        }
    }

    pub fn resume_watchers(&mut self) {
        for entry in &mut self.watchers {
            entry.watcher.resume();
        }
    }

    pub fn watched_lists(&self) -> Vec<ListId> {
        self.watchers.iter().filter_map(|entry| entry.watcher.target()).collect()
    }

    /// Apply every finished deep fetch and re-evaluate the affected items.
    pub fn drain_deep_resolutions(&mut self, page: &mut dyn Page) -> Vec<ItemId> {
        let mut updated = Vec::new();
        while let Some(resolution) = self.resolver.try_next_resolution() {
            if let Some(item) = self.resolver.apply(resolution) {
                if self.recomply(page, item) {
                    updated.push(item);
                }
            }
        }
        if !updated.is_empty() {
            self.finish_deep_run();
        }
        updated
    }

    /// Wait for one deep fetch and apply it. Returns `false` once nothing is
    /// in flight.
    pub async fn next_deep_resolution(&mut self, page: &mut dyn Page) -> bool {
        let Some(resolution) = self.resolver.next_resolution().await else {
            return false;
        };
        if let Some(item) = self.resolver.apply(resolution) {
            if self.recomply(page, item) {
                self.finish_deep_run();
            }
        }
        true
    }

    /// Wait for every in-flight deep fetch.
    pub async fn settle_deep_resolutions(&mut self, page: &mut dyn Page) {
        while self.next_deep_resolution(page).await {}
    }

    fn recomply(&mut self, page: &mut dyn Page, item: ItemId) -> bool {
        if !page.contains(item) {
            self.resolver.release(item);
            return false;
        }
        self.comply_item(page, item);
        true
    }

    fn finish_deep_run(&mut self) {
        self.statistics.update_ui(self.ui.as_mut());
        for hook in &mut self.hooks.after_compliance_run {
            hook(&self.registry, &self.statistics);
        }
    }

    // -------------------------------------------------------------------------
    // Settings actions
    // -------------------------------------------------------------------------

    /// Apply: read the controls and re-run compliance.
    pub fn apply_settings(&mut self, page: &mut dyn Page) {
        self.registry.update();
        self.validate_compliance(page, false);
    }

    /// Save: apply, then persist and bump the sync id.
    pub fn save_settings(&mut self, page: &mut dyn Page) -> Result<()> {
        self.apply_settings(page);
        self.registry.save()
    }

    /// Reset: reload the stored settings and re-run compliance.
    pub fn reset_settings(&mut self, page: &mut dyn Page) -> Result<()> {
        self.registry.revert_changes()?;
        self.validate_compliance(page, false);
        Ok(())
    }

    /// Sync button: same as reset, then hide the button.
    pub fn sync_settings(&mut self, page: &mut dyn Page) -> Result<()> {
        self.reset_settings(page)?;
        self.ui.set_sync_button_visible(false);
        Ok(())
    }

    /// Copy a settings backup to the clipboard. Returns whether it worked.
    pub fn backup_settings(&mut self, clipboard: &mut dyn Clipboard) -> bool {
        match clipboard.write_text(&self.registry.backup()) {
            Ok(()) => {
                self.ui.update_status("Settings backed up to clipboard!", false);
                true
            }
            Err(e) => {
                warn!("{}", e);
                self.ui.update_status("Settings backup failed!", false);
                false
            }
        }
    }

    /// Restore settings from backup text. User and storage failures end up
    /// on the status line; configuration errors are returned.
    pub fn restore_settings(&mut self, page: &mut dyn Page, backup: &str) -> Result<bool> {
        match self.registry.restore(backup) {
            Ok(()) => {
                self.ui.update_status("Settings restored!", false);
                self.validate_compliance(page, false);
                Ok(true)
            }
            Err(Error::UserInput(UserInputError::EmptyRestorePayload)) => {
                self.ui.update_status("No Settings provided!", true);
                Ok(false)
            }
            Err(e) if e.is_recoverable() => {
                warn!("Settings restoration failed: {}", e);
                self.ui.update_status("Settings restoration failed!", false);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Visibility change: pick up settings saved by another instance.
    pub fn on_visibility_change(&mut self, page: &mut dyn Page, document_hidden: bool) -> Result<bool> {
        if !self.registry.check_external_change(document_hidden)? {
            return Ok(false);
        }
        self.validate_compliance(page, false);
        self.ui.set_sync_button_visible(true);
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Page operations
    // -------------------------------------------------------------------------

    /// Run `action` with a field's value when the field is active.
    pub fn perform_operation(
        &mut self,
        page: &mut dyn Page,
        config_key: &str,
        action: impl FnOnce(&mut dyn Page, &FieldView<'_>),
        validation: Option<OperationValidation<'_>>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        let field = self.registry.get_field_or_fail(config_key)?;
        let view = field.view();
        let default = |view: &FieldView<'_>| is_configured(view.kind, view.value);
        let active = match validation {
            Some(validation) => validation(&view, &default),
            None => default(&view),
        };
        if active {
            action(page, &view);
        }
        Ok(self)
    }

    pub fn perform_complex_operation(
        &mut self,
        page: &mut dyn Page,
        config_key: &str,
        validation: OperationValidation<'_>,
        action: impl FnOnce(&mut dyn Page, &FieldView<'_>),
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.perform_operation(page, config_key, action, Some(validation))
    }

    /// [`perform_operation`](Self::perform_operation) gated on a flag field.
    pub fn perform_togglable_operation(
        &mut self,
        page: &mut dyn Page,
        flag_config_key: &str,
        config_key: &str,
        action: impl FnOnce(&mut dyn Page, &FieldView<'_>),
        validation: Option<OperationValidation<'_>>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        if self.registry.get_value(flag_config_key)?.as_flag() == Some(true) {
            self.perform_operation(page, config_key, action, validation)?;
        }
        Ok(self)
    }
}

struct MutationDispatch<'a> {
    enhancer: &'a mut SearchEnhancer,
    page: &'a mut dyn Page,
    paginated: bool,
}

impl MutationHandler for MutationDispatch<'_> {
    fn on_nodes_added(&mut self, target: ListId, nodes: &[ItemId]) {
        debug!("{} items added to {}", nodes.len(), target);
        self.enhancer.comply_items(&mut *self.page, nodes);
        if self.paginated {
            self.enhancer.run_paginator(&mut *self.page);
        }
    }

    fn on_nodes_removed(&mut self, target: ListId, nodes: &[ItemId]) {
        debug!("{} items removed from {}", nodes.len(), target);
        for &item in nodes {
            self.enhancer.resolver.release(item);
        }
    }
}
