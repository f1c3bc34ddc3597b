//! Core type definitions for Sifter
//!
//! These types describe configuration fields, their values and derived forms,
//! and the identities of items observed on a host page.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Item Identity
// =============================================================================

/// Stable identity of one list entry on a host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Identity of one item-list container on a host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{:016x}", self.0)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Presentation state a host keeps for an item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemState: u8 {
        /// Item failed compliance
        const HIDDEN = 1 << 0;
        /// Item is being processed (reduced opacity)
        const DIMMED = 1 << 1;
        /// Item name was rewritten by sanitization rules
        const SANITIZED = 1 << 2;
    }
}

// =============================================================================
// Field Kinds
// =============================================================================

/// Declared kind of a configuration field, with the data that kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Flag,
    Number { minimum: i64, maximum: i64 },
    Range { minimum: i64, maximum: i64 },
    Text,
    /// Drop-down selection over `(label, value)` options
    Select { options: Vec<(String, String)> },
    /// Radio group over `(label, value)` options
    SingleChoice { options: Vec<(String, String)> },
    /// Checkbox group over `(label, value)` options
    MultiChoice { options: Vec<(String, String)> },
    Ruleset { rows: u32 },
    TagRuleset { rows: u32 },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Number { .. } => "number",
            Self::Range { .. } => "range",
            Self::Text => "text",
            Self::Select { .. } => "select",
            Self::SingleChoice { .. } => "radios",
            Self::MultiChoice { .. } => "checkboxes",
            Self::Ruleset { .. } => "ruleset",
            Self::TagRuleset { .. } => "tag-ruleset",
        }
    }

    /// Whether fields of this kind carry an optimized value.
    pub fn is_ruleset(&self) -> bool {
        matches!(self, Self::Ruleset { .. } | Self::TagRuleset { .. })
    }

    pub fn options(&self) -> &[(String, String)] {
        match self {
            Self::Select { options } | Self::SingleChoice { options } | Self::MultiChoice { options } => {
                options
            }
            _ => &[],
        }
    }

    /// Whether `value` has the shape fields of this kind hold.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            Self::Flag => matches!(value, FieldValue::Flag(_)),
            Self::Number { .. } => matches!(value, FieldValue::Number(_)),
            Self::Range { .. } => matches!(value, FieldValue::Range(_)),
            Self::Text => matches!(value, FieldValue::Text(_)),
            Self::Select { .. } | Self::SingleChoice { .. } => matches!(value, FieldValue::Choice(_)),
            Self::MultiChoice { .. } => matches!(value, FieldValue::Choices(_)),
            Self::Ruleset { .. } => matches!(value, FieldValue::Rules(_) | FieldValue::RuleMap(_)),
            Self::TagRuleset { .. } => matches!(value, FieldValue::Rules(_)),
        }
    }

    /// Value a freshly declared field starts with.
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::Flag => FieldValue::Flag(false),
            Self::Number { minimum, .. } => FieldValue::Number(*minimum),
            Self::Range { minimum, .. } => FieldValue::Range(Range {
                minimum: *minimum,
                maximum: *minimum,
            }),
            Self::Text => FieldValue::Text(String::new()),
            Self::Select { options } | Self::SingleChoice { options } => FieldValue::Choice(
                options.first().map(|(_, value)| value.clone()).unwrap_or_default(),
            ),
            Self::MultiChoice { .. } => FieldValue::Choices(Vec::new()),
            Self::Ruleset { .. } | Self::TagRuleset { .. } => FieldValue::Rules(Vec::new()),
        }
    }
}

// =============================================================================
// Field Values
// =============================================================================

/// Inclusive bounds of a range field. Zero on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub minimum: i64,
    pub maximum: i64,
}

/// Current value of a configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Flag(bool),
    Number(i64),
    Range(Range),
    Text(String),
    /// Selected option value (select and radio groups)
    Choice(String),
    /// Selected option values (checkbox groups)
    Choices(Vec<String>),
    /// Raw rule lines
    Rules(Vec<String>),
    /// Rules translated into `substitute -> targets` pairs, in declaration order
    RuleMap(Vec<(String, Vec<String>)>),
}

impl FieldValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<Range> {
        match self {
            Self::Range(range) => Some(*range),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) | Self::Choice(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Choices(values) | Self::Rules(values) => Some(values),
            _ => None,
        }
    }

    /// Number of rules held by a ruleset value.
    pub fn rule_count(&self) -> usize {
        match self {
            Self::Rules(rules) | Self::Choices(rules) => rules.len(),
            Self::RuleMap(pairs) => pairs.len(),
            _ => 0,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Flag(value) => Value::Bool(*value),
            Self::Number(value) => Value::from(*value),
            Self::Range(range) => {
                let mut object = Map::new();
                object.insert("minimum".to_string(), Value::from(range.minimum));
                object.insert("maximum".to_string(), Value::from(range.maximum));
                Value::Object(object)
            }
            Self::Text(value) | Self::Choice(value) => Value::String(value.clone()),
            Self::Choices(values) | Self::Rules(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
            Self::RuleMap(pairs) => {
                let mut object = Map::new();
                for (substitute, targets) in pairs {
                    object.insert(
                        substitute.clone(),
                        Value::Array(targets.iter().cloned().map(Value::String).collect()),
                    );
                }
                Value::Object(object)
            }
        }
    }

    /// Interpret a persisted JSON value using `self` as the shape template.
    ///
    /// Numbers stored as strings are accepted since form controls report text.
    pub fn from_json_like(&self, value: &Value) -> Option<FieldValue> {
        match self {
            Self::Flag(_) => match value {
                Value::Bool(flag) => Some(Self::Flag(*flag)),
                Value::Number(n) => Some(Self::Flag(n.as_i64().unwrap_or(0) != 0)),
                _ => None,
            },
            Self::Number(_) => json_to_i64(value).map(Self::Number),
            Self::Range(_) => {
                let object = value.as_object()?;
                Some(Self::Range(Range {
                    minimum: object.get("minimum").and_then(json_to_i64).unwrap_or(0),
                    maximum: object.get("maximum").and_then(json_to_i64).unwrap_or(0),
                }))
            }
            Self::Text(_) => value.as_str().map(|s| Self::Text(s.to_string())),
            Self::Choice(_) => match value {
                Value::String(s) => Some(Self::Choice(s.clone())),
                Value::Number(n) => Some(Self::Choice(n.to_string())),
                Value::Bool(b) => Some(Self::Choice(b.to_string())),
                _ => None,
            },
            Self::Choices(_) => json_to_strings(value).map(Self::Choices),
            Self::Rules(_) | Self::RuleMap(_) => match value {
                Value::Array(_) => json_to_strings(value).map(Self::Rules),
                Value::Object(object) => {
                    let mut pairs = Vec::with_capacity(object.len());
                    for (substitute, targets) in object {
                        pairs.push((substitute.clone(), json_to_strings(targets)?));
                    }
                    Some(Self::RuleMap(pairs))
                }
                _ => None,
            },
        }
    }
}

fn json_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_to_strings(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Optimized Values
// =============================================================================

/// One conjunctive group of tag selectors; all must match.
pub type Clause = Vec<String>;

/// A compiled replacement: every match of `pattern` becomes `substitute`.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub substitute: String,
    pub pattern: Regex,
}

/// Precompiled form of a ruleset value used during per-item evaluation.
#[derive(Debug, Clone)]
pub enum Optimized {
    /// Rules kept as plain lines (no optimizer registered)
    Lines(Vec<String>),
    /// Whole-word alternation; `None` when there were no rules
    Pattern(Option<Regex>),
    /// Disjunction of conjunctive tag clauses, shortest first
    TagClauses(Vec<Clause>),
    Substitutions(Vec<Substitution>),
}

impl Optimized {
    pub fn as_pattern(&self) -> Option<&Regex> {
        match self {
            Self::Pattern(pattern) => pattern.as_ref(),
            _ => None,
        }
    }

    pub fn as_clauses(&self) -> &[Clause] {
        match self {
            Self::TagClauses(clauses) => clauses,
            _ => &[],
        }
    }

    pub fn as_substitutions(&self) -> &[Substitution] {
        match self {
            Self::Substitutions(substitutions) => substitutions,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Lines(lines) => lines.is_empty(),
            Self::Pattern(pattern) => pattern.is_none(),
            Self::TagClauses(clauses) => clauses.is_empty(),
            Self::Substitutions(substitutions) => substitutions.is_empty(),
        }
    }
}

// =============================================================================
// Item Attributes
// =============================================================================

/// A resolved item attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Flag(bool),
    Number(i64),
    Text(String),
    Texts(Vec<String>),
}

impl AttrValue {
    /// Loose truthiness used by the derived compliance actions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Number(n) => *n != 0,
            Self::Text(text) => !text.is_empty(),
            Self::Texts(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Textual form compared against choice values.
    pub fn to_choice(&self) -> String {
        match self {
            Self::Flag(flag) => flag.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(text) => text.clone(),
            Self::Texts(texts) => texts.join(","),
        }
    }
}
