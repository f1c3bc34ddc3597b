use std::sync::Arc;

use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use sf_core::error::ConfigurationError;
use sf_core::types::{Clause, Substitution};

use crate::parser::{parse_tag_rules, TagExpression};

/// Maps a tag name to the selector that finds it inside an item.
pub type TagSelectorGenerator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Fill `{tag}` in a selector template.
pub fn selector_from_template(template: &str, tag: &str) -> String {
    template.replace("{tag}", tag)
}

/// Case-insensitive alternation of whole words: `(\bw1\b|\bw2\b)`.
///
/// Words are matched literally. Returns `None` when there are no words.
pub fn build_whole_word_pattern(words: &[String]) -> Result<Option<Regex>, ConfigurationError> {
    if words.is_empty() {
        return Ok(None);
    }

    let alternatives: Vec<String> = words
        .iter()
        .map(|word| format!(r"\b{}\b", regex::escape(word)))
        .collect();

    RegexBuilder::new(&format!("({})", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| {
            warn!("Failed to build a pattern from {} words: {}", words.len(), e);
            ConfigurationError::InvalidPattern(e.to_string())
        })
}

/// Compile tag rule lines into a disjunction of conjunctive clauses.
///
/// Each line contributes the clauses of its expression; single tags extend
/// every clause built so far, alternatives multiply them. The result is sorted
/// by clause length (stable, so equal-length clauses keep their order).
pub fn compile_tag_ruleset(rules: &[String], selector: &dyn Fn(&str) -> String) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = Vec::new();

    for expression in parse_tag_rules(rules) {
        clauses.extend(expand_expression(&expression, selector));
    }

    clauses.sort_by_key(Vec::len);
    debug!("Compiled {} tag rules into {} clauses", rules.len(), clauses.len());
    clauses
}

fn expand_expression(expression: &TagExpression, selector: &dyn Fn(&str) -> String) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = Vec::new();

    for term in &expression.terms {
        if clauses.is_empty() {
            for tag in term {
                clauses.push(vec![selector(tag)]);
            }
        } else if term.len() == 1 {
            let tag_selector = selector(&term[0]);
            for clause in &mut clauses {
                clause.push(tag_selector.clone());
            }
        } else {
            let mut grown = Vec::with_capacity(clauses.len() * term.len());
            for tag in term {
                let tag_selector = selector(tag);
                for clause in &clauses {
                    let mut extended = clause.clone();
                    extended.push(tag_selector.clone());
                    grown.push(extended);
                }
            }
            clauses = grown;
        }
    }

    clauses
}

/// Compile `substitute -> targets` pairs into whole-word substitutions.
pub fn compile_substitutions(
    rules: &[(String, Vec<String>)],
) -> Result<Vec<Substitution>, ConfigurationError> {
    let mut substitutions = Vec::with_capacity(rules.len());
    for (substitute, targets) in rules {
        if let Some(pattern) = build_whole_word_pattern(targets)? {
            substitutions.push(Substitution {
                substitute: substitute.clone(),
                pattern,
            });
        }
    }
    Ok(substitutions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn identity(tag: &str) -> String {
        tag.to_string()
    }

    fn clauses(items: &[&[&str]]) -> Vec<Clause> {
        items
            .iter()
            .map(|clause| clause.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_compile_sorts_shorter_clauses_first() {
        let compiled = compile_tag_ruleset(&lines(&["a&b", "c|d"]), &identity);
        assert_eq!(compiled, clauses(&[&["c"], &["d"], &["a", "b"]]));
    }

    #[test]
    fn test_compile_expands_alternatives() {
        let compiled = compile_tag_ruleset(&lines(&["a&b|c&d"]), &identity);
        assert_eq!(compiled, clauses(&[&["a", "b", "d"], &["a", "c", "d"]]));

        let compiled = compile_tag_ruleset(&lines(&["a|b&c|d"]), &identity);
        assert_eq!(
            compiled,
            clauses(&[&["a", "c"], &["b", "c"], &["a", "d"], &["b", "d"]])
        );
    }

    #[test]
    fn test_compile_uses_selector_generator() {
        let generator = |tag: &str| selector_from_template("a[data-tag=\"{tag}\"]", tag);
        let compiled = compile_tag_ruleset(&lines(&["anime"]), &generator);
        assert_eq!(compiled, clauses(&[&["a[data-tag=\"anime\"]"]]));
    }

    #[test]
    fn test_whole_word_pattern() {
        let pattern = build_whole_word_pattern(&lines(&["cat", "a.b"])).unwrap().unwrap();
        assert!(pattern.is_match("A CAT video"));
        assert!(!pattern.is_match("concatenate"));
        assert!(pattern.is_match("see a.b here"));
        assert!(!pattern.is_match("see axb here"));
        assert!(build_whole_word_pattern(&[]).unwrap().is_none());
    }

    #[test]
    fn test_compile_substitutions() {
        let rules = vec![
            ("and".to_string(), vec!["n".to_string()]),
            ("or".to_string(), Vec::new()),
        ];
        let substitutions = compile_substitutions(&rules).unwrap();
        assert_eq!(substitutions.len(), 1);
        assert_eq!(substitutions[0].substitute, "and");
        assert!(substitutions[0].pattern.is_match("rock n roll"));
    }
}
