//! Ready-made filters
//!
//! Each helper declares the fields a filter needs, registers the attribute
//! extractors it reads and appends the filter to the chain. Call them in the
//! order the filters should run.

use log::warn;
use regex::Regex;

use sf_compiler::{
    build_whole_word_pattern, compile_substitutions, format_sanitization_rules, parse_sanitization_rules,
};
use sf_core::error::{ConfigurationError, Result};
use sf_core::page::Page;
use sf_core::text::{is_in_range, parse_duration, parse_percentage};
use sf_core::types::{AttrValue, FieldValue, ItemId, Optimized};

use crate::engine::{
    Paginator, SearchEnhancer, CONFIG_PAGINATOR_LIMIT, CONFIG_PAGINATOR_THRESHOLD, FILTER_TEXT_SANITIZATION,
    FILTER_TEXT_WHITELIST, ITEM_NAME,
};
use crate::filter::{ComplianceAction, ItemContext};
use crate::registry::{is_configured, ConfigurationRegistry, FieldView, RulesetHooks};
use crate::ui::FieldDescriptor;

pub const FILTER_DURATION_RANGE: &str = "Duration";
pub const FILTER_PERCENTAGE_RATING_RANGE: &str = "Rating";
pub const FILTER_SUBSCRIBED_VIDEOS: &str = "Hide Subscribed Videos";
pub const FILTER_TAG_BLACKLIST: &str = "Tag Blacklist";
pub const FILTER_TEXT_BLACKLIST: &str = "Blacklist";
pub const FILTER_TEXT_SEARCH: &str = "Search";
pub const FILTER_UNRATED: &str = "Unrated";

pub const STORE_SUBSCRIPTIONS: &str = "Account Subscriptions";

pub const OPTION_ENABLE_TAG_BLACKLIST: &str = "Enable Tag Blacklist";
pub const OPTION_ENABLE_TEXT_BLACKLIST: &str = "Enable Text Blacklist";

/// Where an item's duration text comes from.
pub enum DurationSource {
    /// Text of the matching descendant
    Selector(String),
    Extractor(Box<dyn Fn(&dyn Page, ItemId) -> Option<String>>),
}

impl From<&str> for DurationSource {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

fn or_default<'a>(help_text: Option<&'a str>, default: &'a str) -> &'a str {
    help_text.unwrap_or(default)
}

fn item_name(context: &mut ItemContext<'_>) -> Option<String> {
    context
        .get(ITEM_NAME)
        .and_then(|name| name.as_text().map(str::to_string))
}

fn whole_word_hooks() -> RulesetHooks {
    RulesetHooks::new().optimize(|value| {
        build_whole_word_pattern(value.as_list().unwrap_or(&[])).map(Optimized::Pattern)
    })
}

/// Whether every selector of some clause matches inside the item.
fn any_clause_matches(page: &dyn Page, item: ItemId, clauses: &[Vec<String>]) -> bool {
    clauses
        .iter()
        .any(|clause| clause.iter().all(|selector| page.has_match(item, selector)))
}

impl SearchEnhancer {
    /// Range filter over durations parsed from `MM:SS` or `H:MM:SS` text. A zero
    /// or unparseable duration counts as unknown and passes.
    pub fn add_item_duration_range_filter(
        &mut self,
        source: impl Into<DurationSource>,
        help_text: Option<&str>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.registry_mut().add_range_field(
            FILTER_DURATION_RANGE,
            0,
            100_000,
            or_default(help_text, "Filter items by duration."),
        );

        let source = source.into();
        self.resolver_mut()
            .add_attribute(FILTER_DURATION_RANGE, move |page: &dyn Page, item: ItemId| {
                let text = match &source {
                    DurationSource::Selector(selector) => page.text(item, selector)?,
                    DurationSource::Extractor(extract) => extract(page, item)?,
                };
                parse_duration(&text)
                    .filter(|seconds| *seconds > 0)
                    .map(AttrValue::Number)
            });

        self.add_item_compliance_filter(FILTER_DURATION_RANGE, None, None)
    }

    /// Range filter over `NN%` ratings. Unrated items pass unless the
    /// "Unrated" flag is set.
    pub fn add_item_percentage_rating_range_filter(
        &mut self,
        rating_selector: &str,
        help_text: Option<&str>,
        unrated_help_text: Option<&str>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.registry_mut()
            .add_range_field(
                FILTER_PERCENTAGE_RATING_RANGE,
                0,
                100_000,
                or_default(help_text, "Filter items by percentage rating."),
            )
            .add_flag_field(
                FILTER_UNRATED,
                or_default(unrated_help_text, "Hide items with zero or no rating."),
            );

        let selector = rating_selector.to_string();
        self.resolver_mut()
            .add_attribute(FILTER_PERCENTAGE_RATING_RANGE, move |page: &dyn Page, item: ItemId| {
                page.text(item, &selector)
                    .and_then(|text| parse_percentage(&text))
                    .map(AttrValue::Number)
            });

        self.add_item_complex_compliance_filter(
            FILTER_PERCENTAGE_RATING_RANGE,
            Box::new(|view: &FieldView<'_>, settings: &ConfigurationRegistry| {
                is_configured(view.kind, view.value) || settings.flag(FILTER_UNRATED)
            }),
            ComplianceAction::Custom(Box::new(|context: &mut ItemContext<'_>, view: &FieldView<'_>| {
                match context
                    .get(FILTER_PERCENTAGE_RATING_RANGE)
                    .and_then(|rating| rating.as_number())
                    .filter(|rating| *rating != 0)
                {
                    Some(rating) => {
                        let range = view.range();
                        is_in_range(rating, range.minimum, range.maximum)
                    }
                    None => !context.flag(FILTER_UNRATED),
                }
            })),
        )
    }

    /// Hide items carrying every tag of some blacklist clause.
    pub fn add_item_tag_blacklist_filter(
        &mut self,
        rows: u32,
        help_text: Option<&str>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.registry_mut()
            .add_flag_field(OPTION_ENABLE_TAG_BLACKLIST, "Applies the blacklist.")
            .add_tag_ruleset_field(
                FILTER_TAG_BLACKLIST,
                rows,
                or_default(
                    help_text,
                    "Specify the tags blacklist with one rule on each line. \"&\" \"|\" can be used.",
                ),
            );

        self.add_item_complex_compliance_filter(
            FILTER_TAG_BLACKLIST,
            Box::new(|view: &FieldView<'_>, settings: &ConfigurationRegistry| {
                settings.flag(OPTION_ENABLE_TAG_BLACKLIST) && !view.clauses().is_empty()
            }),
            ComplianceAction::Custom(Box::new(|context: &mut ItemContext<'_>, view: &FieldView<'_>| {
                !any_clause_matches(&*context.page, context.item, view.clauses())
            })),
        )
    }

    /// Tag ruleset whose matching clauses get `style_class` on an item's first
    /// pass. Not a filter; it never hides anything.
    pub fn add_item_tag_highlights(
        &mut self,
        config_key: &str,
        style_class: &str,
        help_text: &str,
        rows: u32,
    ) -> &mut Self {
        self.registry_mut().add_tag_ruleset_field(config_key, rows, help_text);

        let config_key = config_key.to_string();
        let style_class = style_class.to_string();
        self.on_first_hit_after_compliance(move |context: &mut ItemContext<'_>| {
            let Some(field) = context.settings.get_field(&config_key) else {
                return;
            };
            for clause in field.view().clauses() {
                if clause.iter().all(|selector| context.page.has_match(context.item, selector)) {
                    context.page.add_class(context.item, &clause.join(", "), &style_class);
                }
            }
        })
    }

    /// Hide items whose name contains a blacklisted whole word.
    pub fn add_item_blacklist_filter(&mut self, help_text: &str) -> std::result::Result<&mut Self, ConfigurationError> {
        self.registry_mut()
            .add_flag_field(OPTION_ENABLE_TEXT_BLACKLIST, "Applies the blacklist.")
            .add_ruleset_field(FILTER_TEXT_BLACKLIST, 5, help_text, whole_word_hooks());

        self.add_item_complex_compliance_filter(
            FILTER_TEXT_BLACKLIST,
            Box::new(|view: &FieldView<'_>, settings: &ConfigurationRegistry| {
                settings.flag(OPTION_ENABLE_TEXT_BLACKLIST) && view.value.rule_count() > 0
            }),
            ComplianceAction::Custom(Box::new(|context: &mut ItemContext<'_>, view: &FieldView<'_>| {
                match (item_name(context), view.pattern()) {
                    (Some(name), Some(pattern)) => !pattern.is_match(&name),
                    _ => true,
                }
            })),
        )
    }

    /// Only show items whose name contains a whitelisted whole word. Checked
    /// before the filter chain.
    pub fn add_item_whitelist_filter(&mut self, help_text: &str) -> &mut Self {
        self.registry_mut()
            .add_ruleset_field(FILTER_TEXT_WHITELIST, 5, help_text, whole_word_hooks());
        self
    }

    /// Show items whose name contains the search text.
    pub fn add_item_text_search_filter(
        &mut self,
        help_text: Option<&str>,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.registry_mut().add_text_field(
            FILTER_TEXT_SEARCH,
            or_default(help_text, "Show videos with these comma separated words in their names."),
        );
        self.add_item_compliance_filter(
            FILTER_TEXT_SEARCH,
            Some(ComplianceAction::Custom(Box::new(
                |context: &mut ItemContext<'_>, view: &FieldView<'_>| {
                    item_name(context).map_or(true, |name| name.contains(view.text()))
                },
            ))),
            None,
        )
    }

    /// `substitute=word1,word2` rules rewriting item names on their first pass.
    pub fn add_item_text_sanitization_filter(&mut self, help_text: &str) -> &mut Self {
        self.enable_sanitization();

        let hooks = RulesetHooks::new()
            .translate(|lines| FieldValue::RuleMap(parse_sanitization_rules(lines)))
            .format(|value| match value {
                FieldValue::RuleMap(rules) => format_sanitization_rules(rules),
                other => other.as_list().map(<[String]>::to_vec).unwrap_or_default(),
            })
            .optimize(|value| {
                let rules = match value {
                    FieldValue::RuleMap(rules) => rules.clone(),
                    other => parse_sanitization_rules(other.as_list().unwrap_or(&[])),
                };
                compile_substitutions(&rules).map(Optimized::Substitutions)
            });
        self.registry_mut()
            .add_ruleset_field(FILTER_TEXT_SANITIZATION, 2, help_text, hooks);
        self
    }

    /// Hide items from recorded subscriptions. `exclusions` returns `false` on
    /// pages where the filter must not run; `username` returns `None` to skip
    /// an item.
    pub fn add_subscriptions_filter(
        &mut self,
        exclusions: impl Fn() -> bool + 'static,
        username: impl Fn(&dyn Page, ItemId) -> Option<String> + 'static,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        self.registry_mut()
            .add_flag_field(FILTER_SUBSCRIBED_VIDEOS, "Hide videos from subscribed channels.")
            .add_text_field(STORE_SUBSCRIPTIONS, "Recorded subscription accounts.");

        let logged_in = self.is_user_logged_in();
        self.add_item_complex_compliance_filter(
            FILTER_SUBSCRIBED_VIDEOS,
            Box::new(move |view: &FieldView<'_>, _: &ConfigurationRegistry| {
                view.flag() && logged_in && exclusions()
            }),
            ComplianceAction::Custom(Box::new(move |context: &mut ItemContext<'_>, _: &FieldView<'_>| {
                let Some(username) = username(&*context.page, context.item) else {
                    return true;
                };
                let subscriptions = context
                    .settings
                    .get_value(STORE_SUBSCRIPTIONS)
                    .ok()
                    .and_then(FieldValue::as_str)
                    .unwrap_or("");
                match Regex::new(&format!("\"([^\"]*{}[^\"]*)\"", regex::escape(&username))) {
                    Ok(pattern) => !pattern.is_match(subscriptions),
                    Err(e) => {
                        warn!("Cannot match subscriptions of \"{}\": {}", username, e);
                        true
                    }
                }
            })),
        )
    }

    /// Store a freshly loaded subscription list (as `"a""b"`) and save.
    pub fn record_subscriptions(&mut self, subscriptions: &[String]) -> Result<()> {
        let encoded = if subscriptions.is_empty() {
            String::new()
        } else {
            format!("\"{}\"", subscriptions.join("\"\""))
        };
        self.registry_mut()
            .set_value(STORE_SUBSCRIPTIONS, FieldValue::Text(encoded))?;
        self.registry_mut().save()
    }

    /// Declare the pagination limit and threshold, and install `paginator`.
    pub fn setup_paginator(&mut self, paginator: Option<Box<dyn Paginator>>) -> &mut Self {
        if let Some(paginator) = paginator {
            self.set_paginator(paginator);
        }
        self.registry_mut()
            .add_number_field(
                CONFIG_PAGINATOR_LIMIT,
                1,
                50,
                "Limit paginator to concatenate the specified number of maximum pages.",
            )
            .add_number_field(
                CONFIG_PAGINATOR_THRESHOLD,
                1,
                1000,
                "Make paginator ensure the specified number of minimum results.",
            );
        self
    }

    pub fn create_pagination_controls(&mut self) -> std::result::Result<Vec<FieldDescriptor>, ConfigurationError> {
        Ok(vec![
            self.registry_mut().create_element(CONFIG_PAGINATOR_THRESHOLD)?,
            self.registry_mut().create_element(CONFIG_PAGINATOR_LIMIT)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use sf_core::store::MemoryStorage;
    use sf_core::types::Range;

    use super::*;
    use crate::engine::EnhancerConfig;
    use crate::test_support::{MemoryItem, MemoryPage};
    use crate::ui::{ControlValue, FormState, HeadlessUi};

    fn enhancer() -> SearchEnhancer {
        let mut config = EnhancerConfig::new("sf-", ".title");
        config.tag_selector_template = Some(".tag-{tag}".to_string());
        config.is_user_logged_in = true;
        SearchEnhancer::new(config, Box::new(FormState::new()), Box::new(HeadlessUi::new()))
    }

    fn init(enhancer: &mut SearchEnhancer, page: &mut MemoryPage) {
        assert!(enhancer.init(page, Arc::new(MemoryStorage::new())).unwrap());
    }

    fn set(enhancer: &mut SearchEnhancer, name: &str, value: FieldValue) {
        enhancer.registry_mut().set_value(name, value).unwrap();
    }

    #[test]
    fn test_duration_filter_treats_zero_as_unknown() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let short = page.add_item(list, MemoryItem::new().text(".duration", "0:45"));
        let unknown = page.add_item(list, MemoryItem::new().text(".duration", "0:00"));
        let long = page.add_item(list, MemoryItem::new().text(".duration", "2:30"));

        let mut enhancer = enhancer();
        enhancer.add_item_duration_range_filter(".duration", None).unwrap();
        init(&mut enhancer, &mut page);
        set(&mut enhancer, FILTER_DURATION_RANGE, FieldValue::Range(Range { minimum: 60, maximum: 0 }));
        enhancer.validate_compliance(&mut page, false);

        assert!(page.is_hidden(short));
        assert!(!page.is_hidden(unknown));
        assert!(!page.is_hidden(long));
        assert_eq!(enhancer.statistics().get(FILTER_DURATION_RANGE), 1);
    }

    #[test]
    fn test_duration_extractor() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let item = page.add_item(list, MemoryItem::new().attr(".thumb", "data-length", "1:02:03"));

        let mut enhancer = enhancer();
        enhancer
            .add_item_duration_range_filter(
                DurationSource::Extractor(Box::new(|page: &dyn Page, item: ItemId| {
                    page.attribute(item, ".thumb", "data-length")
                })),
                None,
            )
            .unwrap();
        init(&mut enhancer, &mut page);
        set(&mut enhancer, FILTER_DURATION_RANGE, FieldValue::Range(Range { minimum: 0, maximum: 3600 }));
        enhancer.validate_compliance(&mut page, false);

        assert!(page.is_hidden(item));
    }

    #[test]
    fn test_rating_and_unrated() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let rated = page.add_item(list, MemoryItem::new().text(".rating", "85%"));
        let unrated = page.add_item(list, MemoryItem::new());

        let mut enhancer = enhancer();
        enhancer
            .add_item_percentage_rating_range_filter(".rating", None, None)
            .unwrap();
        init(&mut enhancer, &mut page);

        set(&mut enhancer, FILTER_PERCENTAGE_RATING_RANGE, FieldValue::Range(Range { minimum: 90, maximum: 0 }));
        enhancer.validate_compliance(&mut page, false);
        assert!(page.is_hidden(rated));
        assert!(!page.is_hidden(unrated));

        set(&mut enhancer, FILTER_PERCENTAGE_RATING_RANGE, FieldValue::Range(Range::default()));
        set(&mut enhancer, FILTER_UNRATED, FieldValue::Flag(true));
        enhancer.validate_compliance(&mut page, false);
        assert!(!page.is_hidden(rated));
        assert!(page.is_hidden(unrated));
    }

    #[test]
    fn test_tag_blacklist_needs_a_full_clause() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let both = page.add_item(list, MemoryItem::new().matches(".tag-a").matches(".tag-b"));
        let one = page.add_item(list, MemoryItem::new().matches(".tag-a"));
        let other = page.add_item(list, MemoryItem::new().matches(".tag-c"));

        let mut enhancer = enhancer();
        enhancer.add_item_tag_blacklist_filter(5, None).unwrap();
        init(&mut enhancer, &mut page);
        set(&mut enhancer, FILTER_TAG_BLACKLIST, FieldValue::Rules(vec!["a & b".to_string(), "c".to_string()]));

        enhancer.validate_compliance(&mut page, false);
        assert!(!page.is_hidden(both), "disabled blacklist hides nothing");

        set(&mut enhancer, OPTION_ENABLE_TAG_BLACKLIST, FieldValue::Flag(true));
        enhancer.validate_compliance(&mut page, false);
        assert!(page.is_hidden(both));
        assert!(!page.is_hidden(one));
        assert!(page.is_hidden(other));
    }

    #[test]
    fn test_tag_highlights_run_on_first_hit_only() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let item = page.add_item(list, MemoryItem::new().matches(".tag-a").matches(".tag-b"));

        let storage = Arc::new(MemoryStorage::new());
        {
            let mut seed = enhancer();
            seed.add_item_tag_highlights("Highlights", "highlight", "", 5);
            seed.init(&mut MemoryPage::new(), storage.clone()).unwrap();
            set(&mut seed, "Highlights", FieldValue::Rules(vec!["a&b".to_string()]));
            seed.registry_mut().save().unwrap();
        }

        let mut enhancer = enhancer();
        enhancer.add_item_tag_highlights("Highlights", "highlight", "", 5);
        enhancer.init(&mut page, storage).unwrap();
        enhancer.validate_compliance(&mut page, false);

        assert_eq!(
            page.item(item).classes,
            vec![(".tag-a, .tag-b".to_string(), "highlight".to_string())]
        );
    }

    #[test]
    fn test_text_blacklist_and_search() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let spam = page.add_item(list, MemoryItem::new().text(".title", "Buy SPAM now"));
        let cats = page.add_item(list, MemoryItem::new().text(".title", "Funny cats"));
        let dogs = page.add_item(list, MemoryItem::new().text(".title", "Dogs"));

        let mut enhancer = enhancer();
        enhancer
            .add_item_blacklist_filter("")
            .unwrap()
            .add_item_text_search_filter(None)
            .unwrap();
        init(&mut enhancer, &mut page);
        set(&mut enhancer, OPTION_ENABLE_TEXT_BLACKLIST, FieldValue::Flag(true));
        set(&mut enhancer, FILTER_TEXT_BLACKLIST, FieldValue::Rules(vec!["spam".to_string()]));
        set(&mut enhancer, FILTER_TEXT_SEARCH, FieldValue::Text("cats".to_string()));
        enhancer.validate_compliance(&mut page, false);

        assert!(page.is_hidden(spam));
        assert!(!page.is_hidden(cats));
        assert!(page.is_hidden(dogs));
        assert_eq!(enhancer.statistics().get(FILTER_TEXT_BLACKLIST), 1);
        assert_eq!(enhancer.statistics().get(FILTER_TEXT_SEARCH), 1);
    }

    #[test]
    fn test_sanitization_rewrites_name_before_resolution() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);

        let storage = Arc::new(MemoryStorage::new());
        {
            let mut seed = enhancer();
            seed.add_item_text_sanitization_filter("");
            seed.init(&mut MemoryPage::new(), storage.clone()).unwrap();
            seed.registry_mut().create_element(FILTER_TEXT_SANITIZATION).unwrap();
            seed.registry_mut().interface_mut().write(
                "text-sanitization-rules",
                ControlValue::Lines(vec!["and=n, plus".to_string()]),
            );
            seed.registry_mut().save().unwrap();
        }

        let item = page.add_item(list, MemoryItem::new().text(".title", "Rock n Roll plus more"));
        let mut enhancer = enhancer();
        enhancer.add_item_text_sanitization_filter("");
        let names = Rc::new(RefCell::new(Vec::new()));
        let seen = names.clone();
        enhancer.on_first_hit_before_compliance(move |context: &mut ItemContext<'_>| {
            seen.borrow_mut().push(item_name(context).unwrap_or_default());
        });
        enhancer.init(&mut page, storage).unwrap();

        assert_eq!(page.text(item, ".title"), Some("Rock and Roll and more".to_string()));
        assert_eq!(*names.borrow(), vec!["Rock and Roll and more".to_string()]);
    }

    #[test]
    fn test_sanitization_rule_order_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let rules = vec![
            ("zeta".to_string(), vec!["x".to_string()]),
            ("beta".to_string(), vec!["zeta".to_string()]),
        ];
        {
            let mut seed = enhancer();
            seed.add_item_text_sanitization_filter("");
            seed.init(&mut MemoryPage::new(), storage.clone()).unwrap();
            seed.registry_mut().create_element(FILTER_TEXT_SANITIZATION).unwrap();
            set(&mut seed, FILTER_TEXT_SANITIZATION, FieldValue::RuleMap(rules.clone()));
            seed.registry_mut().save().unwrap();
        }

        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let item = page.add_item(list, MemoryItem::new().text(".title", "x"));
        let mut enhancer = enhancer();
        enhancer.add_item_text_sanitization_filter("");
        enhancer.init(&mut page, storage).unwrap();

        assert_eq!(
            enhancer.registry().get_value(FILTER_TEXT_SANITIZATION).unwrap(),
            &FieldValue::RuleMap(rules)
        );
        assert_eq!(page.text(item, ".title"), Some("beta".to_string()));
    }

    #[test]
    fn test_subscriptions_filter() {
        let mut page = MemoryPage::new();
        let list = page.add_list(&[".videos"]);
        let subscribed = page.add_item(list, MemoryItem::new().text(".user", "alice"));
        let stranger = page.add_item(list, MemoryItem::new().text(".user", "bob"));
        let anonymous = page.add_item(list, MemoryItem::new());

        let mut enhancer = enhancer();
        enhancer
            .add_subscriptions_filter(|| true, |page: &dyn Page, item: ItemId| page.text(item, ".user"))
            .unwrap();
        init(&mut enhancer, &mut page);
        enhancer
            .record_subscriptions(&["alice".to_string(), "carol".to_string()])
            .unwrap();
        assert_eq!(
            enhancer.registry().get_value(STORE_SUBSCRIPTIONS).unwrap().as_str(),
            Some("\"alice\"\"carol\"")
        );

        set(&mut enhancer, FILTER_SUBSCRIBED_VIDEOS, FieldValue::Flag(true));
        enhancer.validate_compliance(&mut page, false);
        assert!(page.is_hidden(subscribed));
        assert!(!page.is_hidden(stranger));
        assert!(!page.is_hidden(anonymous));
    }

    #[test]
    fn test_pagination_fields_and_controls() {
        let mut enhancer = enhancer();
        enhancer.setup_paginator(None);

        let limit = enhancer.registry().get_field(CONFIG_PAGINATOR_LIMIT).unwrap();
        assert_eq!(limit.value(), &FieldValue::Number(1));
        let controls = enhancer.create_pagination_controls().unwrap();
        assert_eq!(controls[0].key, "pagination-threshold");
        assert!(enhancer.registry().get_field(CONFIG_PAGINATOR_THRESHOLD).unwrap().is_bound());
    }
}
