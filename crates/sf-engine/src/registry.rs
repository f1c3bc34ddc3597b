//! Configuration registry
//!
//! Named, typed settings fields with a persisted store. Field keys are the
//! kebab-case form of their titles. Ruleset fields keep an optimized copy of
//! their value which is rebuilt every time the value changes, so filters never
//! see a stale compiled form.
//!
//! Persistence uses two stores under the script prefix: `<prefix>settings`
//! holds the values and `<prefix>settings-id` holds a random sync id that is
//! rewritten on every save. Another instance notices the id change when its
//! page becomes visible again and reloads.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{Map, Value};

use sf_compiler::{compile_tag_ruleset, TagSelectorGenerator};
use sf_core::codec;
use sf_core::error::{ConfigurationError, Result, UserInputError};
use sf_core::store::{generate_id, LocalStore, StorageBackend};
use sf_core::text::{split_lines, to_kebab_case, trim_and_keep_non_empty};
use sf_core::types::{Clause, FieldKind, FieldValue, Optimized, Range, Substitution};

use crate::filter::ValidationFn;
use crate::ui::{ControlValue, FieldDescriptor, SettingsInterface};

// =============================================================================
// Ruleset Hooks
// =============================================================================

/// Turns trimmed rule lines into a field value.
pub type TranslateFn = Box<dyn Fn(&[String]) -> FieldValue>;
/// Turns a field value back into rule lines for display.
pub type FormatFn = Box<dyn Fn(&FieldValue) -> Vec<String>>;
/// Precompiles a field value for per-item evaluation.
pub type OptimizeFn = Box<dyn Fn(&FieldValue) -> std::result::Result<Optimized, ConfigurationError>>;

#[derive(Default)]
pub struct RulesetHooks {
    translate: Option<TranslateFn>,
    format: Option<FormatFn>,
    optimize: Option<OptimizeFn>,
}

impl RulesetHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(mut self, translate: impl Fn(&[String]) -> FieldValue + 'static) -> Self {
        self.translate = Some(Box::new(translate));
        self
    }

    pub fn format(mut self, format: impl Fn(&FieldValue) -> Vec<String> + 'static) -> Self {
        self.format = Some(Box::new(format));
        self
    }

    pub fn optimize(
        mut self,
        optimize: impl Fn(&FieldValue) -> std::result::Result<Optimized, ConfigurationError> + 'static,
    ) -> Self {
        self.optimize = Some(Box::new(optimize));
        self
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Borrowed view handed to validation and compliance callbacks.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub key: &'a str,
    pub kind: &'a FieldKind,
    pub value: &'a FieldValue,
    /// Present for ruleset fields only
    pub optimized: Option<&'a Optimized>,
}

impl<'a> FieldView<'a> {
    pub fn flag(&self) -> bool {
        self.value.as_flag().unwrap_or(false)
    }

    pub fn number(&self) -> i64 {
        self.value.as_number().unwrap_or(0)
    }

    pub fn range(&self) -> Range {
        self.value.as_range().unwrap_or_default()
    }

    pub fn text(&self) -> &'a str {
        self.value.as_str().unwrap_or("")
    }

    pub fn list(&self) -> &'a [String] {
        self.value.as_list().unwrap_or(&[])
    }

    pub fn pattern(&self) -> Option<&'a regex::Regex> {
        self.optimized.and_then(Optimized::as_pattern)
    }

    pub fn clauses(&self) -> &'a [Clause] {
        self.optimized.map(Optimized::as_clauses).unwrap_or(&[])
    }

    pub fn substitutions(&self) -> &'a [Substitution] {
        self.optimized.map(Optimized::as_substitutions).unwrap_or(&[])
    }
}

pub struct ConfigurationField {
    title: String,
    key: String,
    kind: FieldKind,
    value: FieldValue,
    optimized: Option<Optimized>,
    help_text: Option<String>,
    bound: bool,
    hooks: RulesetHooks,
}

impl ConfigurationField {
    fn new(title: &str, kind: FieldKind) -> Self {
        Self {
            title: title.to_string(),
            key: to_kebab_case(title),
            value: kind.default_value(),
            kind,
            optimized: None,
            help_text: None,
            bound: false,
            hooks: RulesetHooks::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn optimized(&self) -> Option<&Optimized> {
        self.optimized.as_ref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }

    /// Whether a UI control was created for this field.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn view(&self) -> FieldView<'_> {
        FieldView {
            key: &self.key,
            kind: &self.kind,
            value: &self.value,
            optimized: self.optimized.as_ref(),
        }
    }

    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            key: self.key.clone(),
            title: self.title.clone(),
            kind: self.kind.clone(),
            help_text: self.help_text.clone(),
        }
    }

    fn set_value(&mut self, value: FieldValue) {
        self.value = value;
        self.reoptimize();
    }

    fn reoptimize(&mut self) {
        if !self.kind.is_ruleset() {
            self.optimized = None;
            return;
        }
        let optimized = match &self.hooks.optimize {
            Some(optimize) => optimize(&self.value).unwrap_or_else(|e| {
                warn!("Failed to optimize \"{}\": {}", self.title, e);
                Optimized::Lines(Vec::new())
            }),
            None => Optimized::Lines(self.rule_lines()),
        };
        self.optimized = Some(optimized);
    }

    fn rule_lines(&self) -> Vec<String> {
        match &self.hooks.format {
            Some(format) => format(&self.value),
            None => self.value.as_list().map(<[String]>::to_vec).unwrap_or_default(),
        }
    }

    fn translate(&self, lines: Vec<String>) -> FieldValue {
        match &self.hooks.translate {
            Some(translate) => translate(&lines),
            None => FieldValue::Rules(lines),
        }
    }

    fn apply_control(&mut self, control: ControlValue) {
        let value = match (&self.kind, control) {
            (FieldKind::Flag, ControlValue::Checked(checked)) => FieldValue::Flag(checked),
            (FieldKind::Number { .. }, ControlValue::Text(text)) => {
                FieldValue::Number(parse_control_number(&text))
            }
            (FieldKind::Range { .. }, ControlValue::Pair(minimum, maximum)) => FieldValue::Range(Range {
                minimum: parse_control_number(&minimum),
                maximum: parse_control_number(&maximum),
            }),
            (FieldKind::Text, ControlValue::Text(text)) => FieldValue::Text(text),
            (FieldKind::Select { .. } | FieldKind::SingleChoice { .. }, ControlValue::Text(text)) => {
                FieldValue::Choice(text)
            }
            (FieldKind::MultiChoice { .. }, ControlValue::Many(values)) => FieldValue::Choices(values),
            (FieldKind::Ruleset { .. } | FieldKind::TagRuleset { .. }, ControlValue::Lines(lines)) => {
                self.translate(trim_and_keep_non_empty(lines.iter().map(String::as_str)))
            }
            (FieldKind::Ruleset { .. } | FieldKind::TagRuleset { .. }, ControlValue::Text(text)) => {
                self.translate(split_lines(&text))
            }
            (kind, control) => {
                warn!("Ignoring {:?} read from the {} control of \"{}\"", control, kind.name(), self.key);
                return;
            }
        };
        self.set_value(value);
    }

    fn to_control(&self) -> ControlValue {
        match &self.value {
            FieldValue::Flag(checked) => ControlValue::Checked(*checked),
            FieldValue::Number(number) => ControlValue::Text(number.to_string()),
            FieldValue::Range(range) => {
                ControlValue::Pair(range.minimum.to_string(), range.maximum.to_string())
            }
            FieldValue::Text(text) | FieldValue::Choice(text) => ControlValue::Text(text.clone()),
            FieldValue::Choices(values) => ControlValue::Many(values.clone()),
            FieldValue::Rules(_) | FieldValue::RuleMap(_) => ControlValue::Lines(self.rule_lines()),
        }
    }
}

fn parse_control_number(text: &str) -> i64 {
    text.trim().parse().unwrap_or(0)
}

/// Default "is this filter configured" test for a field kind.
pub fn is_configured(kind: &FieldKind, value: &FieldValue) -> bool {
    match kind {
        FieldKind::Flag => value.as_flag().unwrap_or(false),
        FieldKind::Number { .. } => value.as_number().is_some_and(|n| n > 0),
        FieldKind::Range { .. } => value
            .as_range()
            .is_some_and(|range| range.minimum > 0 || range.maximum > 0),
        FieldKind::Text | FieldKind::Select { .. } | FieldKind::SingleChoice { .. } => {
            value.as_str().is_some_and(|text| !text.is_empty())
        }
        FieldKind::MultiChoice { .. } | FieldKind::Ruleset { .. } | FieldKind::TagRuleset { .. } => {
            value.rule_count() > 0
        }
    }
}

fn owned_options(options: &[(&str, &str)]) -> Vec<(String, String)> {
    options
        .iter()
        .map(|(label, value)| (label.to_string(), value.to_string()))
        .collect()
}

// =============================================================================
// Registry
// =============================================================================

pub struct ConfigurationRegistry {
    fields: IndexMap<String, ConfigurationField>,
    interface: Box<dyn SettingsInterface>,
    tag_selector_generator: Option<TagSelectorGenerator>,
    store: Option<LocalStore>,
    id_store: Option<LocalStore>,
    synced_id: u64,
}

impl ConfigurationRegistry {
    pub fn new(
        interface: Box<dyn SettingsInterface>,
        tag_selector_generator: Option<TagSelectorGenerator>,
    ) -> Self {
        Self {
            fields: IndexMap::new(),
            interface,
            tag_selector_generator,
            store: None,
            id_store: None,
            synced_id: 0,
        }
    }

    /// Declare (or redeclare) a field. Redeclaring keeps the field's position
    /// and resets it to the new kind's default value.
    fn create_field(&mut self, name: &str, kind: FieldKind, help_text: &str) -> &mut ConfigurationField {
        let key = to_kebab_case(name);
        let field = self
            .fields
            .entry(key)
            .or_insert_with(|| ConfigurationField::new(name, kind.clone()));

        field.value = kind.default_value();
        field.kind = kind;
        field.hooks = RulesetHooks::default();
        if !help_text.is_empty() {
            field.help_text = Some(help_text.to_string());
        }
        field.reoptimize();
        field
    }

    pub fn add_flag_field(&mut self, name: &str, help_text: &str) -> &mut Self {
        self.create_field(name, FieldKind::Flag, help_text);
        self
    }

    pub fn add_number_field(&mut self, name: &str, minimum: i64, maximum: i64, help_text: &str) -> &mut Self {
        self.create_field(name, FieldKind::Number { minimum, maximum }, help_text);
        self
    }

    pub fn add_range_field(&mut self, name: &str, minimum: i64, maximum: i64, help_text: &str) -> &mut Self {
        self.create_field(name, FieldKind::Range { minimum, maximum }, help_text);
        self
    }

    pub fn add_text_field(&mut self, name: &str, help_text: &str) -> &mut Self {
        self.create_field(name, FieldKind::Text, help_text);
        self
    }

    pub fn add_select_field(&mut self, name: &str, options: &[(&str, &str)], help_text: &str) -> &mut Self {
        let options = owned_options(options);
        self.create_field(name, FieldKind::Select { options }, help_text);
        self
    }

    pub fn add_radios_group(&mut self, name: &str, options: &[(&str, &str)], help_text: &str) -> &mut Self {
        let options = owned_options(options);
        self.create_field(name, FieldKind::SingleChoice { options }, help_text);
        self
    }

    pub fn add_checkboxes_group(&mut self, name: &str, options: &[(&str, &str)], help_text: &str) -> &mut Self {
        let options = owned_options(options);
        self.create_field(name, FieldKind::MultiChoice { options }, help_text);
        self
    }

    pub fn add_ruleset_field(&mut self, name: &str, rows: u32, help_text: &str, hooks: RulesetHooks) -> &mut Self {
        let field = self.create_field(name, FieldKind::Ruleset { rows }, help_text);
        field.hooks = hooks;
        field.reoptimize();
        self
    }

    /// A ruleset of tag expressions compiled into selector clauses with the
    /// registry's tag selector generator (tags are used as-is without one).
    pub fn add_tag_ruleset_field(&mut self, name: &str, rows: u32, help_text: &str) -> &mut Self {
        let generator = self.tag_selector_generator.clone();
        let field = self.create_field(name, FieldKind::TagRuleset { rows }, help_text);
        field.hooks = RulesetHooks::new().optimize(move |value| {
            let rules = value.as_list().unwrap_or(&[]);
            let clauses = match &generator {
                Some(generator) => compile_tag_ruleset(rules, &**generator),
                None => compile_tag_ruleset(rules, &|tag: &str| tag.to_string()),
            };
            Ok(Optimized::TagClauses(clauses))
        });
        field.reoptimize();
        self
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(&to_kebab_case(name))
    }

    pub fn get_field(&self, name: &str) -> Option<&ConfigurationField> {
        self.fields.get(&to_kebab_case(name))
    }

    pub fn get_field_or_fail(&self, name: &str) -> std::result::Result<&ConfigurationField, ConfigurationError> {
        self.get_field(name)
            .ok_or_else(|| ConfigurationError::FieldNotFound(name.to_string()))
    }

    pub fn get_value(&self, name: &str) -> std::result::Result<&FieldValue, ConfigurationError> {
        self.get_field_or_fail(name).map(ConfigurationField::value)
    }

    /// Flag value, `false` for a missing or non-flag field.
    pub fn flag(&self, name: &str) -> bool {
        self.get_field(name)
            .and_then(|field| field.value().as_flag())
            .unwrap_or(false)
    }

    /// Number value, `0` for a missing or non-number field.
    pub fn number(&self, name: &str) -> i64 {
        self.get_field(name)
            .and_then(|field| field.value().as_number())
            .unwrap_or(0)
    }

    /// Set a value programmatically. A bound control is updated to match.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> std::result::Result<(), ConfigurationError> {
        let key = to_kebab_case(name);
        let field = self
            .fields
            .get_mut(&key)
            .ok_or_else(|| ConfigurationError::FieldNotFound(name.to_string()))?;
        if !field.kind.accepts(&value) {
            return Err(ConfigurationError::KindMismatch {
                key: field.key.clone(),
                expected: field.kind.name(),
            });
        }
        field.set_value(value);
        if field.bound {
            self.interface.write(&field.key, field.to_control());
        }
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = &ConfigurationField> {
        self.fields.values()
    }

    /// Create the UI control for a field and bind the field to it.
    pub fn create_element(&mut self, name: &str) -> std::result::Result<FieldDescriptor, ConfigurationError> {
        let key = to_kebab_case(name);
        let field = self
            .fields
            .get_mut(&key)
            .ok_or_else(|| ConfigurationError::FieldNotFound(name.to_string()))?;
        field.bound = true;
        let descriptor = field.descriptor();
        self.interface.create_control(&descriptor);
        self.interface.write(&field.key, field.to_control());
        Ok(descriptor)
    }

    pub fn interface(&self) -> &dyn SettingsInterface {
        self.interface.as_ref()
    }

    pub fn interface_mut(&mut self) -> &mut dyn SettingsInterface {
        self.interface.as_mut()
    }

    /// Default activation test for a filter over `name`, chosen by its kind.
    pub fn generate_validation_callback(&self, name: &str) -> std::result::Result<ValidationFn, ConfigurationError> {
        let kind = self.get_field_or_fail(name)?.kind().clone();
        Ok(Box::new(move |view: &FieldView<'_>, _: &ConfigurationRegistry| {
            is_configured(&kind, view.value)
        }))
    }

    // -------------------------------------------------------------------------
    // Interface Sync
    // -------------------------------------------------------------------------

    /// Read every bound control into its field.
    pub fn update(&mut self) {
        for field in self.fields.values_mut().filter(|field| field.bound) {
            if let Some(control) = self.interface.read(&field.key) {
                field.apply_control(control);
            }
        }
    }

    /// Write every bound field into its control.
    pub fn update_interface(&mut self) {
        for field in self.fields.values().filter(|field| field.bound) {
            self.interface.write(&field.key, field.to_control());
        }
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    pub fn initialize(&mut self, script_prefix: &str, backend: Arc<dyn StorageBackend>) -> Result<&mut Self> {
        let store_key = format!("{}settings", script_prefix);
        let mut store = LocalStore::new(backend.clone(), store_key.clone(), self.to_store_object());
        store.on_change(move |data| debug!("Wrote {} settings to '{}'", data.len(), store_key));

        let mut id_defaults = Map::new();
        id_defaults.insert("id".to_string(), Value::from(generate_id()));
        let mut id_store = LocalStore::new(backend, format!("{}settings-id", script_prefix), id_defaults);

        self.synced_id = read_store_id(&mut id_store)?;
        self.store = Some(store);
        self.id_store = Some(id_store);
        self.sync_local_store(true)?;
        Ok(self)
    }

    pub fn synced_id(&self) -> u64 {
        self.synced_id
    }

    /// Reload when another instance changed the stored sync id while this
    /// page was in the background. Returns whether a reload happened.
    pub fn check_external_change(&mut self, document_hidden: bool) -> Result<bool> {
        if document_hidden {
            return Ok(false);
        }
        let id_store = self.id_store.as_mut().ok_or(ConfigurationError::NotInitialized)?;
        let current = read_store_id(id_store)?;
        if current == self.synced_id {
            return Ok(false);
        }

        info!("Settings changed externally ({} -> {}), reloading", self.synced_id, current);
        self.sync_local_store(true)?;
        self.synced_id = current;
        Ok(true)
    }

    /// Read the controls, persist and issue a new sync id.
    pub fn save(&mut self) -> Result<()> {
        self.update();
        let data = self.to_store_object();
        self.store
            .as_mut()
            .ok_or(ConfigurationError::NotInitialized)?
            .save(&data)?;
        self.update_store_id(None)
    }

    /// Discard unsaved edits by reloading from the store.
    pub fn revert_changes(&mut self) -> Result<()> {
        self.sync_local_store(false)
    }

    /// Encoded snapshot of the current values plus the sync id.
    pub fn backup(&self) -> String {
        let mut data = self.to_store_object();
        data.insert("id".to_string(), Value::from(self.synced_id));
        codec::encode(&data)
    }

    /// Replace the stored settings with a backup. Nothing is written unless
    /// the whole payload decodes.
    pub fn restore(&mut self, backup: &str) -> Result<()> {
        if backup.trim().is_empty() {
            return Err(UserInputError::EmptyRestorePayload.into());
        }
        let mut data = codec::decode(backup)?;
        let id = data.remove("id").and_then(|id| id.as_u64());

        self.store
            .as_mut()
            .ok_or(ConfigurationError::NotInitialized)?
            .save(&data)?;
        self.sync_local_store(false)?;
        self.update_store_id(id)
    }

    fn sync_local_store(&mut self, ignore_if_defaults_set: bool) -> Result<()> {
        let store = self.store.as_mut().ok_or(ConfigurationError::NotInitialized)?;
        let stored = store.get()?;

        if !ignore_if_defaults_set || !store.were_defaults_set() {
            for field in self.fields.values_mut() {
                let Some(value) = stored.get(&field.key) else {
                    continue;
                };
                match field.value.from_json_like(value) {
                    Some(value) => field.set_value(value),
                    None => warn!(
                        "Ignoring stored value of \"{}\": not a {} value",
                        field.key,
                        field.kind.name()
                    ),
                }
            }
        }

        self.update_interface();
        Ok(())
    }

    fn update_store_id(&mut self, id: Option<u64>) -> Result<()> {
        let id = id.unwrap_or_else(generate_id);
        let mut data = Map::new();
        data.insert("id".to_string(), Value::from(id));
        self.id_store
            .as_mut()
            .ok_or(ConfigurationError::NotInitialized)?
            .save(&data)?;
        self.synced_id = id;
        Ok(())
    }

    fn to_store_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(key, field)| (key.clone(), field.value.to_json()))
            .collect()
    }
}

fn read_store_id(store: &mut LocalStore) -> Result<u64> {
    Ok(store.get()?.get("id").and_then(Value::as_u64).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::FormState;
    use sf_compiler::{build_whole_word_pattern, selector_from_template};
    use sf_core::store::MemoryStorage;

    fn registry() -> ConfigurationRegistry {
        let generator: TagSelectorGenerator =
            Arc::new(|tag: &str| selector_from_template("a[data-tag=\"{tag}\"]", tag));
        ConfigurationRegistry::new(Box::new(FormState::new()), Some(generator))
    }

    fn pattern_hooks() -> RulesetHooks {
        RulesetHooks::new().optimize(|value| {
            build_whole_word_pattern(value.as_list().unwrap_or(&[])).map(Optimized::Pattern)
        })
    }

    #[test]
    fn test_keys_are_kebab_case_and_idempotent() {
        let mut registry = registry();
        registry
            .add_flag_field("Tag Blacklist", "first")
            .add_flag_field("Tag Blacklist", "");

        assert_eq!(registry.fields().count(), 1);
        let field = registry.get_field("tag blacklist").unwrap();
        assert_eq!(field.key(), "tag-blacklist");
        assert_eq!(field.help_text(), Some("first"));
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let registry = registry();
        assert!(matches!(
            registry.get_value("Nope"),
            Err(ConfigurationError::FieldNotFound(name)) if name == "Nope"
        ));
        assert!(registry.generate_validation_callback("Nope").is_err());
    }

    #[test]
    fn test_validation_callback_by_kind() {
        let mut registry = registry();
        registry
            .add_range_field("Duration", 0, 100_000, "")
            .add_ruleset_field("Blacklist", 5, "", RulesetHooks::new());

        let duration = registry.generate_validation_callback("Duration").unwrap();
        let blacklist = registry.generate_validation_callback("Blacklist").unwrap();
        assert!(!duration(&registry.get_field("Duration").unwrap().view(), &registry));
        assert!(!blacklist(&registry.get_field("Blacklist").unwrap().view(), &registry));

        registry
            .set_value("Duration", FieldValue::Range(Range { minimum: 0, maximum: 60 }))
            .unwrap();
        registry
            .set_value("Blacklist", FieldValue::Rules(vec!["spam".to_string()]))
            .unwrap();
        assert!(duration(&registry.get_field("Duration").unwrap().view(), &registry));
        assert!(blacklist(&registry.get_field("Blacklist").unwrap().view(), &registry));
    }

    #[test]
    fn test_set_value_rejects_other_kinds() {
        let mut registry = registry();
        registry.add_range_field("Duration", 0, 100_000, "");

        let result = registry.set_value("Duration", FieldValue::Number(60));
        assert!(matches!(
            result,
            Err(ConfigurationError::KindMismatch { key, expected: "range" }) if key == "duration"
        ));
        assert_eq!(
            registry.get_value("Duration").unwrap(),
            &FieldValue::Range(Range { minimum: 0, maximum: 0 })
        );
    }

    #[test]
    fn test_optimized_value_tracks_raw_value() {
        let mut registry = registry();
        registry.add_ruleset_field("Blacklist", 5, "", pattern_hooks());
        assert!(registry.get_field("Blacklist").unwrap().view().pattern().is_none());

        registry
            .set_value("Blacklist", FieldValue::Rules(vec!["spam".to_string()]))
            .unwrap();
        let pattern = registry.get_field("Blacklist").unwrap().view().pattern().unwrap();
        assert!(pattern.is_match("Spam video"));
    }

    #[test]
    fn test_tag_ruleset_uses_generator() {
        let mut registry = registry();
        registry.add_tag_ruleset_field("Tag Blacklist", 5, "");
        registry
            .set_value("Tag Blacklist", FieldValue::Rules(vec!["a & b".to_string()]))
            .unwrap();

        let field = registry.get_field("Tag Blacklist").unwrap();
        assert_eq!(
            field.view().clauses(),
            &[vec!["a[data-tag=\"a\"]".to_string(), "a[data-tag=\"b\"]".to_string()]]
        );
    }

    #[test]
    fn test_update_reads_bound_controls_only() {
        let mut registry = registry();
        registry
            .add_text_field("Search", "")
            .add_ruleset_field("Blacklist", 5, "", pattern_hooks());
        registry.create_element("Blacklist").unwrap();

        registry.interface_mut().write("search", ControlValue::Text("ignored".to_string()));
        registry.interface_mut().write(
            "blacklist",
            ControlValue::Lines(vec![" spam ".to_string(), String::new(), "ads".to_string()]),
        );
        registry.update();

        assert_eq!(registry.get_value("Search").unwrap(), &FieldValue::Text(String::new()));
        assert_eq!(
            registry.get_value("Blacklist").unwrap(),
            &FieldValue::Rules(vec!["spam".to_string(), "ads".to_string()])
        );
        assert!(registry
            .get_field("Blacklist")
            .unwrap()
            .view()
            .pattern()
            .is_some_and(|p| p.is_match("ADS here")));
    }

    #[test]
    fn test_save_and_reload_across_instances() {
        let storage = Arc::new(MemoryStorage::new());

        let mut first = registry();
        first.add_range_field("Duration", 0, 100_000, "");
        first.create_element("Duration").unwrap();
        first.initialize("sf-", storage.clone()).unwrap();

        let mut second = registry();
        second.add_range_field("Duration", 0, 100_000, "");
        second.initialize("sf-", storage.clone()).unwrap();
        let initial_id = second.synced_id();

        first
            .interface_mut()
            .write("duration", ControlValue::Pair("60".to_string(), "600".to_string()));
        first.save().unwrap();
        assert_ne!(first.synced_id(), initial_id);

        assert!(!second.check_external_change(true).unwrap());
        assert!(second.check_external_change(false).unwrap());
        assert_eq!(
            second.get_value("Duration").unwrap(),
            &FieldValue::Range(Range { minimum: 60, maximum: 600 })
        );
        assert!(!second.check_external_change(false).unwrap());
    }

    #[test]
    fn test_revert_discards_unsaved_edits() {
        let storage = Arc::new(MemoryStorage::new());
        let mut registry = registry();
        registry.add_text_field("Search", "");
        registry.create_element("Search").unwrap();
        registry.initialize("sf-", storage).unwrap();

        registry.interface_mut().write("search", ControlValue::Text("cats".to_string()));
        registry.update();
        assert_eq!(registry.get_value("Search").unwrap().as_str(), Some("cats"));

        registry.revert_changes().unwrap();
        assert_eq!(registry.get_value("Search").unwrap().as_str(), Some(""));
        assert_eq!(
            registry.interface().read("search"),
            Some(ControlValue::Text(String::new()))
        );
    }

    #[test]
    fn test_backup_restore_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        let mut registry = registry();
        registry
            .add_flag_field("Unrated", "")
            .add_tag_ruleset_field("Tag Blacklist", 5, "");
        registry.initialize("sf-", storage.clone()).unwrap();
        registry.set_value("Unrated", FieldValue::Flag(true)).unwrap();
        registry
            .set_value("Tag Blacklist", FieldValue::Rules(vec!["a|b".to_string()]))
            .unwrap();
        let backup = registry.backup();
        let id = registry.synced_id();

        let mut restored = self::registry();
        restored
            .add_flag_field("Unrated", "")
            .add_tag_ruleset_field("Tag Blacklist", 5, "");
        restored.initialize("sf-other-", storage).unwrap();
        restored.restore(&backup).unwrap();

        assert!(restored.flag("Unrated"));
        assert_eq!(restored.get_field("Tag Blacklist").unwrap().view().clauses().len(), 2);
        assert_eq!(restored.synced_id(), id);
    }

    #[test]
    fn test_restore_rejects_bad_payloads_without_writing() {
        let storage = Arc::new(MemoryStorage::new());
        let mut registry = registry();
        registry.add_flag_field("Unrated", "");
        registry.initialize("sf-", storage).unwrap();
        let id = registry.synced_id();

        let empty = registry.restore("   ").unwrap_err();
        assert!(matches!(
            empty,
            sf_core::Error::UserInput(UserInputError::EmptyRestorePayload)
        ));
        let malformed = registry.restore("{not json").unwrap_err();
        assert!(malformed.is_recoverable());
        assert_eq!(registry.synced_id(), id);
        assert!(!registry.flag("Unrated"));
    }

    #[test]
    fn test_operations_before_initialize_fail() {
        let mut registry = registry();
        assert!(matches!(
            registry.save(),
            Err(sf_core::Error::Configuration(ConfigurationError::NotInitialized))
        ));
    }
}
