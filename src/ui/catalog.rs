use crate::ui::serializer::LIST_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub display_name: String,
    pub group_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub id: FieldId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFieldGroup {
    pub label: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub field: Field,
    is_selected: bool,
}

impl CatalogEntry {
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLoadDiagnostic {
    pub catalog_id: String,
    pub field_ref: String,
    pub reason: String,
}

impl CatalogLoadDiagnostic {
    pub fn to_log_line(&self) -> String {
        format!(
            "catalog load rejected catalog={} field_ref={} reason={}",
            self.catalog_id, self.field_ref, self.reason
        )
    }
}

/// Fields offered by one selector, in server order and partitioned by group.
///
/// Entry positions are fixed at load time: selecting or deselecting a field
/// only flips its `is_selected` flag, so a deselected field reappears exactly
/// where it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    entries: Vec<CatalogEntry>,
    index: BTreeMap<FieldId, usize>,
    groups: Vec<String>,
}

pub struct CatalogGroup<'a> {
    pub label: &'a str,
    pub entries: Vec<&'a CatalogEntry>,
}

impl FieldCatalog {
    pub fn from_groups(
        catalog_id: &str,
        groups: &[RawFieldGroup],
    ) -> (Self, Vec<CatalogLoadDiagnostic>) {
        let mut catalog = Self::default();
        let mut diagnostics = Vec::new();

        for group in groups {
            let label = group.label.trim();
            for raw in &group.fields {
                if raw.id.as_str().is_empty() {
                    diagnostics.push(CatalogLoadDiagnostic {
                        catalog_id: catalog_id.to_string(),
                        field_ref: format!("{label}:{}", raw.name),
                        reason: "field id is required".to_string(),
                    });
                    continue;
                }
                if raw.id.as_str().contains(LIST_SEPARATOR) {
                    diagnostics.push(CatalogLoadDiagnostic {
                        catalog_id: catalog_id.to_string(),
                        field_ref: raw.id.to_string(),
                        reason: format!("field id contains list separator `{LIST_SEPARATOR}`"),
                    });
                    continue;
                }
                if catalog.index.contains_key(&raw.id) {
                    diagnostics.push(CatalogLoadDiagnostic {
                        catalog_id: catalog_id.to_string(),
                        field_ref: raw.id.to_string(),
                        reason: "duplicate field id".to_string(),
                    });
                    continue;
                }
                catalog.push(Field {
                    id: raw.id.clone(),
                    display_name: raw.name.trim().to_string(),
                    group_label: label.to_string(),
                });
            }
        }

        (catalog, diagnostics)
    }

    fn push(&mut self, field: Field) {
        if !self.groups.iter().any(|label| *label == field.group_label) {
            self.groups.push(field.group_label.clone());
        }
        self.index.insert(field.id.clone(), self.entries.len());
        self.entries.push(CatalogEntry {
            field,
            is_selected: false,
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, field_id: &FieldId) -> bool {
        self.index.contains_key(field_id)
    }

    pub fn get(&self, field_id: &FieldId) -> Option<&CatalogEntry> {
        self.index.get(field_id).map(|position| &self.entries[*position])
    }

    #[cfg(test)]
    pub fn is_selected(&self, field_id: &FieldId) -> bool {
        self.get(field_id).is_some_and(CatalogEntry::is_selected)
    }

    pub fn display_name<'a>(&'a self, field_id: &'a FieldId) -> &'a str {
        self.get(field_id)
            .map(|entry| entry.field.display_name.as_str())
            .unwrap_or_else(|| field_id.as_str())
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &FieldId> {
        self.entries.iter().map(|entry| &entry.field.id)
    }

    /// Returns `false` when the id is not part of the catalog.
    pub(crate) fn mark_selected(&mut self, field_id: &FieldId, selected: bool) -> bool {
        match self.index.get(field_id) {
            Some(position) => {
                self.entries[*position].is_selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn groups(&self) -> Vec<CatalogGroup<'_>> {
        self.groups
            .iter()
            .map(|label| CatalogGroup {
                label: label.as_str(),
                entries: self
                    .entries
                    .iter()
                    .filter(|entry| entry.field.group_label == *label)
                    .collect(),
            })
            .collect()
    }
}
