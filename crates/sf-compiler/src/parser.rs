use log::debug;
use sf_core::text::trim_and_keep_non_empty;

/// A tag rule line: a conjunction of terms, each term a disjunction of tags.
///
/// `"a&b|c"` parses to `[[a], [b, c]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpression {
    pub terms: Vec<Vec<String>>,
}

impl TagExpression {
    /// Number of conjunctive clauses this expression expands into.
    pub fn clause_count(&self) -> usize {
        self.terms.iter().map(Vec::len).product()
    }
}

pub fn parse_tag_expression(line: &str) -> Option<TagExpression> {
    let mut terms = Vec::new();

    for and_term in line.split('&') {
        let alternatives = trim_and_keep_non_empty(and_term.split('|'));
        if !alternatives.is_empty() {
            terms.push(alternatives);
        }
    }

    if terms.is_empty() {
        return None;
    }

    Some(TagExpression { terms })
}

pub fn parse_tag_rules(lines: &[String]) -> Vec<TagExpression> {
    lines
        .iter()
        .filter_map(|line| parse_tag_expression(line))
        .collect()
}

/// Translate `substitute=word1,word2` lines into ordered pairs.
///
/// Lines without `=` and lines with no target words are skipped. An empty
/// substitute means a single space. A repeated substitute replaces the
/// earlier targets but keeps its original position.
pub fn parse_sanitization_rules(lines: &[String]) -> Vec<(String, Vec<String>)> {
    let mut rules: Vec<(String, Vec<String>)> = Vec::new();

    for line in lines {
        let Some((substitute, targets)) = line.split_once('=') else {
            debug!("Skipping sanitization rule without '=': {:?}", line);
            continue;
        };
        let substitute = if substitute.is_empty() { " " } else { substitute };
        let targets = trim_and_keep_non_empty(targets.split(','));
        if targets.is_empty() {
            continue;
        }

        match rules.iter_mut().find(|(existing, _)| existing == substitute) {
            Some((_, existing_targets)) => *existing_targets = targets,
            None => rules.push((substitute.to_string(), targets)),
        }
    }

    rules
}

pub fn format_sanitization_rules(rules: &[(String, Vec<String>)]) -> Vec<String> {
    rules
        .iter()
        .map(|(substitute, targets)| format!("{}={}", substitute, targets.join(",")))
        .collect()
}
