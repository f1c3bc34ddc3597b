//! Sifter Engine
//!
//! Runs the compliance pipeline over the items of a search page. A host
//! script declares configuration fields and filters on a [`SearchEnhancer`],
//! hands it a [`Page`](sf_core::Page) and lets it hide every item that fails
//! a filter.
//!
//! # Modules
//!
//! - `registry`: configuration fields, control binding, persistence and backups
//! - `resolver`: per-item attribute bags and deep (detail page) attributes
//! - `filter`: compliance filters and kind-derived predicates
//! - `engine`: the enhancer, its hooks and settings actions
//! - `presets`: ready-made duration, rating, tag, text and subscription filters
//! - `html`: a `scraper` backed page for offline documents
//! - `ui`: settings interface and status surface traits with headless versions

pub mod engine;
pub mod filter;
pub mod html;
pub mod presets;
pub mod registry;
pub mod resolver;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use engine::{EnhancerConfig, Paginator, SearchEnhancer};
pub use filter::{ComplianceAction, ComplianceFilter, ItemContext};
pub use html::{DetailFragment, HtmlPage};
pub use presets::DurationSource;
pub use registry::{ConfigurationField, ConfigurationRegistry, FieldView, RulesetHooks};
pub use resolver::{AttributeResolver, DeepResolution, DetailFetcher};
pub use ui::{Clipboard, ControlValue, EnhancerUi, FieldDescriptor, FormState, HeadlessUi, SettingsInterface};
