//! Event delegation keyed by element structure.
//!
//! Handlers are registered against a stable root container and a predicate
//! over the target element (class, tag, data attribute). Elements rendered
//! after registration match exactly like the ones present at load, since
//! nothing is bound to an individual element.

use crate::ui::catalog::FieldId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DOCUMENT_ROOT: &str = "document";
pub const FIELD_ID_ATTR: &str = "field-id";
pub const LINK_ID_ATTR: &str = "link-id";
pub const METHOD_ATTR: &str = "method";
pub const REMOVE_FIELD_CLASS: &str = "remove-field";
pub const ADD_FIELD_CLASS: &str = "add-field";

/// Structural description of an interacted element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub tag: String,
    pub classes: BTreeSet<String>,
    pub data: BTreeMap<String, String>,
}

impl ElementRef {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        for class in &self.classes {
            out.push('.');
            out.push_str(class);
        }
        for (key, value) in &self.data {
            out.push_str(&format!("[data-{key}={value}]"));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementPredicate {
    Tag(String),
    HasClass(String),
    HasData(String),
    All(Vec<ElementPredicate>),
}

impl ElementPredicate {
    pub fn matches(&self, element: &ElementRef) -> bool {
        match self {
            Self::Tag(tag) => element.tag.eq_ignore_ascii_case(tag),
            Self::HasClass(class) => element.has_class(class),
            Self::HasData(key) => element.data.contains_key(key),
            Self::All(predicates) => predicates.iter().all(|predicate| predicate.matches(element)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegatedAction {
    AddField,
    RemoveField,
    ActivateLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegated {
    pub root: String,
    pub action: DelegatedAction,
    pub field_id: Option<FieldId>,
    pub link_id: Option<String>,
}

#[derive(Debug, Clone)]
struct Subscription {
    root: String,
    predicate: ElementPredicate,
    action: DelegatedAction,
}

#[derive(Debug, Clone, Default)]
pub struct DelegationRegistry {
    subscriptions: Vec<Subscription>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        root: impl Into<String>,
        predicate: ElementPredicate,
        action: DelegatedAction,
    ) {
        self.subscriptions.push(Subscription {
            root: root.into(),
            predicate,
            action,
        });
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// First subscription registered on `root` whose predicate matches wins.
    pub fn dispatch(&self, root: &str, target: &ElementRef) -> Option<Delegated> {
        let subscription = self
            .subscriptions
            .iter()
            .find(|subscription| subscription.root == root && subscription.predicate.matches(target))?;

        Some(Delegated {
            root: subscription.root.clone(),
            action: subscription.action,
            field_id: target.data(FIELD_ID_ATTR).map(FieldId::new),
            link_id: target.data(LINK_ID_ATTR).map(ToString::to_string),
        })
    }
}
