use crate::ui::runtime::PageSettings;
use crate::ui::selector::ConsistencyPolicy;
use crate::ui::serializer::ListEncoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod store;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub schema_version: u32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default)]
    pub list_encoding: ListEncoding,
    #[serde(default = "default_csrf_field")]
    pub csrf_field: String,
    /// Form field carrying the real method when non-POST submissions travel
    /// as POST, e.g. `_method`.
    #[serde(default)]
    pub method_override_field: Option<String>,
    #[serde(default)]
    pub consistency: ConsistencyPolicy,
    /// Page description to load; the embedded demo page when unset.
    #[serde(default)]
    pub page_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_csrf_field() -> String {
    "csrf_token".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            base_url: default_base_url(),
            search_debounce_ms: default_debounce_ms(),
            list_encoding: ListEncoding::default(),
            csrf_field: default_csrf_field(),
            method_override_field: None,
            consistency: ConsistencyPolicy::default(),
            page_file: None,
        }
    }
}

impl ConsoleConfig {
    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            csrf_field: self.csrf_field.clone(),
            method_override_field: self.method_override_field.clone(),
            list_encoding: self.list_encoding,
            consistency: self.consistency,
            search_debounce: Duration::from_millis(self.search_debounce_ms),
        }
    }
}
