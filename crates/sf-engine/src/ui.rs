//! User-interface seams
//!
//! The engine drives controls it does not render. A [`SettingsInterface`]
//! holds one control per bound configuration field; an [`EnhancerUi`] shows
//! the status line, the statistics labels and the sync button.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sf_core::error::TransientIoError;
use sf_core::stats::StatisticsSink;
use sf_core::types::FieldKind;

/// Raw content of one form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Checked(bool),
    Text(String),
    /// Minimum and maximum inputs of a range control
    Pair(String, String),
    /// Checked option values of a checkbox group
    Many(Vec<String>),
    /// Textarea content, one rule per line
    Lines(Vec<String>),
}

/// What a host needs to render the control for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub key: String,
    pub title: String,
    pub kind: FieldKind,
    pub help_text: Option<String>,
}

pub trait SettingsInterface {
    /// Render (or re-render) the control for a field.
    fn create_control(&mut self, field: &FieldDescriptor);

    fn read(&self, key: &str) -> Option<ControlValue>;

    fn write(&mut self, key: &str, value: ControlValue);
}

/// Controls kept in memory. Used by headless hosts and tests; editing a
/// control is a [`write`](SettingsInterface::write).
#[derive(Debug, Default)]
pub struct FormState {
    descriptors: Vec<FieldDescriptor>,
    controls: HashMap<String, ControlValue>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }
}

impl SettingsInterface for FormState {
    fn create_control(&mut self, field: &FieldDescriptor) {
        self.descriptors.retain(|existing| existing.key != field.key);
        self.descriptors.push(field.clone());
    }

    fn read(&self, key: &str) -> Option<ControlValue> {
        self.controls.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: ControlValue) {
        self.controls.insert(key.to_string(), value);
    }
}

// =============================================================================
// Enhancer UI
// =============================================================================

pub trait EnhancerUi: StatisticsSink {
    /// Show `message` on the status line; transient messages revert to the
    /// default status after a short delay.
    fn update_status(&mut self, message: &str, transient: bool);

    fn reset_status(&mut self);

    fn set_sync_button_visible(&mut self, visible: bool);

    /// Attach the settings pane; a pinned pane stays open.
    fn embed_settings_pane(&mut self, _pinned: bool) {}
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), TransientIoError>;
}

/// What a [`HeadlessUi`] has been told to display.
#[derive(Debug, Default, Clone)]
pub struct UiState {
    pub status: String,
    pub status_history: Vec<String>,
    pub statistics: HashMap<String, u64>,
    pub sync_button_visible: bool,
    pub settings_pane_pinned: bool,
}

/// UI without a screen. Clones share state, so a host can keep one handle
/// and give the other to the engine.
#[derive(Debug, Default, Clone)]
pub struct HeadlessUi {
    state: Arc<Mutex<UiState>>,
}

impl HeadlessUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UiState {
        self.state.lock().map(|state| state.clone()).unwrap_or_default()
    }

    fn with_state(&self, f: impl FnOnce(&mut UiState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }
}

impl StatisticsSink for HeadlessUi {
    fn set_statistic(&mut self, label_id: &str, value: u64) {
        self.with_state(|state| {
            state.statistics.insert(label_id.to_string(), value);
        });
    }
}

impl EnhancerUi for HeadlessUi {
    fn update_status(&mut self, message: &str, transient: bool) {
        log::info!("{}", message);
        self.with_state(|state| {
            state.status_history.push(message.to_string());
            if !transient {
                state.status = message.to_string();
            }
        });
    }

    fn reset_status(&mut self) {
        self.with_state(|state| state.status.clear());
    }

    fn set_sync_button_visible(&mut self, visible: bool) {
        self.with_state(|state| state.sync_button_visible = visible);
    }

    fn embed_settings_pane(&mut self, pinned: bool) {
        self.with_state(|state| state.settings_pane_pinned = pinned);
    }
}

/// Clipboard holding the last copied text.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), TransientIoError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
