//! Sifter Rule Compiler
//!
//! This crate turns user-written rule lines into the optimized forms the
//! compliance engine evaluates: whole-word patterns, tag clauses and
//! substitution tables.

pub mod parser;
pub mod optimizer;

pub use optimizer::{
    build_whole_word_pattern, compile_substitutions, compile_tag_ruleset, selector_from_template,
    TagSelectorGenerator,
};
pub use parser::{
    format_sanitization_rules, parse_sanitization_rules, parse_tag_expression, parse_tag_rules,
    TagExpression,
};
