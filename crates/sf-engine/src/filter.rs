//! Compliance filters
//!
//! A filter pairs a configuration field with an activation test and a
//! per-item compliance predicate. When no predicate is given, one is derived
//! from the field kind and compares the field against an item attribute.

use sf_core::error::ConfigurationError;
use sf_core::page::Page;
use sf_core::text::is_in_range;
use sf_core::types::{AttrValue, FieldKind, FieldValue, ItemId};

use crate::registry::{ConfigurationRegistry, FieldView};
use crate::resolver::AttributeResolver;

/// Decides whether a filter takes part in the compliance chain.
pub type ValidationFn = Box<dyn Fn(&FieldView<'_>, &ConfigurationRegistry) -> bool>;

/// Decides whether one item passes a filter.
pub type ComplianceFn = Box<dyn Fn(&mut ItemContext<'_>, &FieldView<'_>) -> bool>;

/// Everything a compliance predicate may touch while judging one item.
pub struct ItemContext<'a> {
    pub page: &'a mut dyn Page,
    pub item: ItemId,
    pub settings: &'a ConfigurationRegistry,
    pub attributes: &'a mut AttributeResolver,
}

impl<'a> ItemContext<'a> {
    /// Resolved attribute of the item; may schedule a deep fetch.
    pub fn get(&mut self, name: &str) -> Option<AttrValue> {
        self.attributes.get(&*self.page, self.item, name)
    }

    pub fn set(&mut self, name: &str, value: AttrValue) {
        self.attributes.set(self.item, name, value);
    }

    pub fn flag(&self, name: &str) -> bool {
        self.settings.flag(name)
    }
}

/// How an item is judged when it reaches a filter.
pub enum ComplianceAction {
    /// Compare the field against the named attribute, by field kind
    Attribute(String),
    Custom(ComplianceFn),
}

pub struct ComplianceFilter {
    config_key: String,
    validate: ValidationFn,
    comply: ComplianceFn,
}

impl ComplianceFilter {
    pub fn new(config_key: impl Into<String>, validate: ValidationFn, comply: ComplianceFn) -> Self {
        Self {
            config_key: config_key.into(),
            validate,
            comply,
        }
    }

    /// Field title the filter reads; also its statistics label.
    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn is_active(&self, view: &FieldView<'_>, settings: &ConfigurationRegistry) -> bool {
        (self.validate)(view, settings)
    }

    pub fn complies(&self, context: &mut ItemContext<'_>, view: &FieldView<'_>) -> bool {
        (self.comply)(context, view)
    }
}

/// Predicate comparing a field of `kind` against attribute `attribute`.
///
/// Items lacking the attribute (or carrying a falsy one) always pass.
pub fn derive_compliance_action(
    config_key: &str,
    kind: &FieldKind,
    attribute: &str,
) -> Result<ComplianceFn, ConfigurationError> {
    let attribute = attribute.to_string();

    let action: ComplianceFn = match kind {
        FieldKind::Flag => Box::new(move |context: &mut ItemContext<'_>, _: &FieldView<'_>| {
            context.get(&attribute).map_or(true, |value| value.is_truthy())
        }),
        FieldKind::Number { .. } => Box::new(move |context: &mut ItemContext<'_>, view: &FieldView<'_>| {
            match context.get(&attribute).filter(AttrValue::is_truthy) {
                Some(value) => value.as_number().map_or(true, |number| number >= view.number()),
                None => true,
            }
        }),
        FieldKind::Range { .. } => Box::new(move |context: &mut ItemContext<'_>, view: &FieldView<'_>| {
            match context.get(&attribute).filter(AttrValue::is_truthy) {
                Some(value) => {
                    let range = view.range();
                    value
                        .as_number()
                        .map_or(true, |number| is_in_range(number, range.minimum, range.maximum))
                }
                None => true,
            }
        }),
        FieldKind::Select { .. } | FieldKind::SingleChoice { .. } => {
            Box::new(move |context: &mut ItemContext<'_>, view: &FieldView<'_>| {
                match context.get(&attribute).filter(AttrValue::is_truthy) {
                    Some(value) => view.text() == value.to_choice(),
                    None => true,
                }
            })
        }
        FieldKind::MultiChoice { .. } => Box::new(move |context: &mut ItemContext<'_>, view: &FieldView<'_>| {
            let selected = match view.value {
                FieldValue::Choices(selected) => selected,
                _ => return true,
            };
            match context.get(&attribute).filter(AttrValue::is_truthy) {
                Some(value) if !selected.is_empty() => selected.contains(&value.to_choice()),
                _ => true,
            }
        }),
        FieldKind::Text | FieldKind::Ruleset { .. } | FieldKind::TagRuleset { .. } => {
            return Err(ConfigurationError::MissingComplianceAction {
                key: config_key.to_string(),
                kind: kind.name(),
            })
        }
    };

    Ok(action)
}
