//! WebAssembly bindings for Sifter
//!
//! Userscript hosts keep their DOM code in JavaScript and call in here for
//! rule compilation, the settings codec and the small parsing helpers.

use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

use sf_compiler::{
    build_whole_word_pattern as whole_word_pattern, compile_substitutions,
    compile_tag_ruleset as tag_clauses, parse_sanitization_rules, selector_from_template,
};
use sf_core::codec;
use sf_core::text as helpers;

fn report(context: &str, message: &str) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&format!("[sifter] {}: {}", context, message)));
    JsValue::from_str(message)
}

fn string_list(value: &JsValue, what: &str) -> Result<Vec<String>, JsValue> {
    js_sys::Array::from(value)
        .iter()
        .map(|entry| {
            entry
                .as_string()
                .ok_or_else(|| report(what, "entries must be strings"))
        })
        .collect()
}

fn clauses_for(rules: &[String], selector_template: Option<&str>) -> Vec<Vec<String>> {
    match selector_template {
        Some(template) => tag_clauses(rules, &|tag: &str| selector_from_template(template, tag)),
        None => tag_clauses(rules, &|tag: &str| tag.to_string()),
    }
}

fn encode_json(json: &str) -> Result<String, String> {
    let value: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let object: Map<String, Value> = match value {
        Value::Object(object) => object,
        _ => return Err("settings must be a JSON object".to_string()),
    };
    Ok(codec::encode(&object))
}

fn decode_to_json(text: &str) -> Result<String, String> {
    let object = codec::decode(text).map_err(|e| e.to_string())?;
    Ok(Value::Object(object).to_string())
}

/// Compile tag rule lines into clauses of selectors.
///
/// Returns an array of arrays; an item matches when every selector of some
/// clause matches inside it.
#[wasm_bindgen]
pub fn compile_tag_ruleset(rules: JsValue, selector_template: Option<String>) -> Result<JsValue, JsValue> {
    let rules = string_list(&rules, "compile_tag_ruleset")?;
    let clauses = clauses_for(&rules, selector_template.as_deref());

    let result = js_sys::Array::new_with_length(clauses.len() as u32);
    for (i, clause) in clauses.iter().enumerate() {
        let selectors = js_sys::Array::new();
        for selector in clause {
            selectors.push(&JsValue::from_str(selector));
        }
        result.set(i as u32, selectors.into());
    }
    Ok(result.into())
}

/// Source of the case-insensitive whole-word pattern for `words`, or
/// `undefined` when there are none.
#[wasm_bindgen]
pub fn build_whole_word_pattern(words: JsValue) -> Result<Option<String>, JsValue> {
    let words = string_list(&words, "build_whole_word_pattern")?;
    whole_word_pattern(&words)
        .map(|pattern| pattern.map(|regex| regex.as_str().to_string()))
        .map_err(|e| report("build_whole_word_pattern", &e.to_string()))
}

/// `substitute=word1,word2` lines as `{ substitute, pattern }` objects.
#[wasm_bindgen]
pub fn compile_sanitization_rules(lines: JsValue) -> Result<JsValue, JsValue> {
    let lines = string_list(&lines, "compile_sanitization_rules")?;
    let substitutions = compile_substitutions(&parse_sanitization_rules(&lines))
        .map_err(|e| report("compile_sanitization_rules", &e.to_string()))?;

    let result = js_sys::Array::new_with_length(substitutions.len() as u32);
    for (i, substitution) in substitutions.iter().enumerate() {
        let entry = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&entry, &"substitute".into(), &JsValue::from_str(&substitution.substitute));
        let _ = js_sys::Reflect::set(&entry, &"pattern".into(), &JsValue::from_str(substitution.pattern.as_str()));
        result.set(i as u32, entry.into());
    }
    Ok(result.into())
}

/// Encode a settings object (as JSON text) into its persisted form.
#[wasm_bindgen]
pub fn encode_settings(json: &str) -> Result<String, JsValue> {
    encode_json(json).map_err(|e| report("encode_settings", &e))
}

/// Decode persisted settings back into JSON text.
#[wasm_bindgen]
pub fn decode_settings(text: &str) -> Result<String, JsValue> {
    decode_to_json(text).map_err(|e| report("decode_settings", &e))
}

#[wasm_bindgen]
pub fn parse_duration(text: &str) -> Option<f64> {
    helpers::parse_duration(text).map(|seconds| seconds as f64)
}

#[wasm_bindgen]
pub fn parse_percentage(text: &str) -> Option<f64> {
    helpers::parse_percentage(text).map(|rating| rating as f64)
}

/// Bounds of zero or below are open.
#[wasm_bindgen]
pub fn is_in_range(value: f64, lower_bound: f64, upper_bound: f64) -> bool {
    helpers::is_in_range(value as i64, lower_bound as i64, upper_bound as i64)
}

#[wasm_bindgen]
pub fn to_kebab_case(text: &str) -> String {
    helpers::to_kebab_case(text)
}
