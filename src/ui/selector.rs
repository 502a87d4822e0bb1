use crate::ui::catalog::{FieldCatalog, FieldId};
use crate::ui::selection::SelectionList;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("field `{field_id}` is not in the catalog of selector `{selector_id}`")]
    UnknownField {
        selector_id: String,
        field_id: FieldId,
    },
    #[error("no selector `{selector_id}` on this page")]
    UnknownSelector { selector_id: String },
}

/// How a `ConsistencyError` surfaces once it reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// Propagate the error to the caller.
    Strict,
    /// Log and treat the mutation as a no-op.
    Lenient,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorChange {
    Added { field_id: FieldId, index: usize },
    Moved { field_id: FieldId, from: usize, to: usize },
    Removed { field_id: FieldId, index: usize },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorCommand {
    ToggleIn(FieldId),
    ToggleOut(FieldId),
    InsertAt { index: usize, field_id: FieldId },
}

/// One catalog/selection pairing on a page, serialized under
/// `form_field_name` when its form is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorInstance {
    id: String,
    form_id: String,
    form_field_name: String,
    catalog: FieldCatalog,
    selection: SelectionList,
}

impl SelectorInstance {
    pub fn new(
        id: impl Into<String>,
        form_id: impl Into<String>,
        form_field_name: impl Into<String>,
        catalog: FieldCatalog,
        initial: &[FieldId],
    ) -> Result<Self, ConsistencyError> {
        let mut instance = Self {
            id: id.into(),
            form_id: form_id.into(),
            form_field_name: form_field_name.into(),
            catalog,
            selection: SelectionList::new(),
        };
        for field_id in initial {
            instance.toggle_in(field_id)?;
        }
        Ok(instance)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn form_field_name(&self) -> &str {
        &self.form_field_name
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionList {
        &self.selection
    }

    fn ensure_known(&self, field_id: &FieldId) -> Result<(), ConsistencyError> {
        if self.catalog.contains(field_id) {
            Ok(())
        } else {
            Err(ConsistencyError::UnknownField {
                selector_id: self.id.clone(),
                field_id: field_id.clone(),
            })
        }
    }

    pub fn toggle_in(&mut self, field_id: &FieldId) -> Result<SelectorChange, ConsistencyError> {
        self.ensure_known(field_id)?;
        match self.selection.push(field_id.clone()) {
            Some(index) => {
                self.catalog.mark_selected(field_id, true);
                Ok(SelectorChange::Added {
                    field_id: field_id.clone(),
                    index,
                })
            }
            None => Ok(SelectorChange::Unchanged),
        }
    }

    pub fn toggle_out(&mut self, field_id: &FieldId) -> SelectorChange {
        match self.selection.remove(field_id) {
            Some(index) => {
                self.catalog.mark_selected(field_id, false);
                SelectorChange::Removed {
                    field_id: field_id.clone(),
                    index,
                }
            }
            None => SelectorChange::Unchanged,
        }
    }

    pub fn insert_at(
        &mut self,
        index: usize,
        field_id: &FieldId,
    ) -> Result<SelectorChange, ConsistencyError> {
        self.ensure_known(field_id)?;
        let (previous, target) = self.selection.insert_at(index, field_id.clone());
        self.catalog.mark_selected(field_id, true);
        Ok(match previous {
            Some(from) if from == target => SelectorChange::Unchanged,
            Some(from) => SelectorChange::Moved {
                field_id: field_id.clone(),
                from,
                to: target,
            },
            None => SelectorChange::Added {
                field_id: field_id.clone(),
                index: target,
            },
        })
    }

    pub fn to_array(&self) -> Vec<FieldId> {
        self.selection.to_array()
    }
}

/// Vertical extent of a rendered selected item, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemBounds {
    pub top: f32,
    pub bottom: f32,
}

impl ItemBounds {
    pub fn midpoint(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Index of the first item whose midpoint is at or below the pointer, or the
/// end of the list. Screen y grows downward.
pub fn resolve_drop_index(pointer_y: f32, items: &[ItemBounds]) -> usize {
    items
        .iter()
        .position(|item| item.midpoint() >= pointer_y)
        .unwrap_or(items.len())
}

/// Applies selector commands, deciding how consistency failures surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorController {
    policy: ConsistencyPolicy,
}

impl SelectorController {
    pub fn new(policy: ConsistencyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConsistencyPolicy {
        self.policy
    }

    pub fn apply(
        &self,
        instance: &mut SelectorInstance,
        command: SelectorCommand,
    ) -> Result<SelectorChange, ConsistencyError> {
        let result = match &command {
            SelectorCommand::ToggleIn(field_id) => instance.toggle_in(field_id),
            SelectorCommand::ToggleOut(field_id) => Ok(instance.toggle_out(field_id)),
            SelectorCommand::InsertAt { index, field_id } => instance.insert_at(*index, field_id),
        };

        match result {
            Ok(change) => {
                if change != SelectorChange::Unchanged {
                    tracing::debug!(selector = instance.id(), ?change, "selection changed");
                }
                Ok(change)
            }
            Err(err) => match self.policy {
                ConsistencyPolicy::Strict => {
                    tracing::error!(selector = instance.id(), %err, "rejected selector command");
                    Err(err)
                }
                ConsistencyPolicy::Lenient => {
                    tracing::warn!(selector = instance.id(), %err, "ignored selector command");
                    Ok(SelectorChange::Unchanged)
                }
            },
        }
    }

    pub fn drop_at(
        &self,
        instance: &mut SelectorInstance,
        field_id: FieldId,
        pointer_y: f32,
        items: &[ItemBounds],
    ) -> Result<SelectorChange, ConsistencyError> {
        let index = resolve_drop_index(pointer_y, items);
        self.apply(instance, SelectorCommand::InsertAt { index, field_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::catalog::{RawField, RawFieldGroup};
    use proptest::prelude::*;

    const IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

    fn instance(initial: &[&str]) -> SelectorInstance {
        let groups = vec![RawFieldGroup {
            label: "Finance".to_string(),
            fields: IDS
                .iter()
                .map(|id| RawField {
                    id: FieldId::new(*id),
                    name: id.to_uppercase(),
                })
                .collect(),
        }];
        let (catalog, _) = FieldCatalog::from_groups("report_fields", &groups);
        let initial: Vec<FieldId> = initial.iter().map(|id| FieldId::new(*id)).collect();
        SelectorInstance::new("report_fields", "create_report", "fields", catalog, &initial)
            .expect("initial selection should be consistent")
    }

    fn order(instance: &SelectorInstance) -> Vec<&str> {
        instance.selection().iter().map(FieldId::as_str).collect()
    }

    fn bounds(count: usize) -> Vec<ItemBounds> {
        (0..count)
            .map(|i| ItemBounds {
                top: i as f32 * 20.0,
                bottom: i as f32 * 20.0 + 20.0,
            })
            .collect()
    }

    #[test]
    fn toggle_in_twice_leaves_list_unchanged() {
        let mut selector = instance(&["a"]);
        let id = FieldId::new("b");
        selector.toggle_in(&id).expect("known field");
        let before = selector.to_array();
        assert_eq!(
            selector.toggle_in(&id).expect("known field"),
            SelectorChange::Unchanged
        );
        assert_eq!(selector.to_array(), before);
        assert!(selector.catalog().is_selected(&id));
    }

    #[test]
    fn toggle_out_then_in_moves_field_to_end() {
        let mut selector = instance(&["a", "b", "c"]);
        let a = FieldId::new("a");
        selector.toggle_out(&a);
        assert!(!selector.catalog().is_selected(&a));
        selector.toggle_in(&a).expect("known field");
        assert_eq!(order(&selector), vec!["b", "c", "a"]);
    }

    #[test]
    fn toggle_out_is_idempotent_and_keeps_catalog_order() {
        let mut selector = instance(&["b"]);
        let catalog_before: Vec<FieldId> = selector.catalog().keys().cloned().collect();
        assert!(matches!(
            selector.toggle_out(&FieldId::new("b")),
            SelectorChange::Removed { index: 0, .. }
        ));
        assert_eq!(
            selector.toggle_out(&FieldId::new("b")),
            SelectorChange::Unchanged
        );
        let catalog_after: Vec<FieldId> = selector.catalog().keys().cloned().collect();
        assert_eq!(catalog_before, catalog_after);
    }

    #[test]
    fn unknown_field_is_a_consistency_error() {
        let mut selector = instance(&[]);
        let err = selector
            .insert_at(0, &FieldId::new("zz"))
            .expect_err("unknown field should be rejected");
        assert!(matches!(err, ConsistencyError::UnknownField { .. }));
        assert!(selector.selection().is_empty());
    }

    #[test]
    fn lenient_policy_turns_consistency_errors_into_no_ops() {
        let mut selector = instance(&["a"]);
        let controller = SelectorController::new(ConsistencyPolicy::Lenient);
        let change = controller
            .apply(&mut selector, SelectorCommand::ToggleIn(FieldId::new("zz")))
            .expect("lenient policy should swallow the error");
        assert_eq!(change, SelectorChange::Unchanged);
        assert_eq!(order(&selector), vec!["a"]);

        let strict = SelectorController::new(ConsistencyPolicy::Strict);
        assert!(strict
            .apply(&mut selector, SelectorCommand::ToggleIn(FieldId::new("zz")))
            .is_err());
    }

    #[test]
    fn drop_index_picks_first_midpoint_below_pointer() {
        let items = bounds(3); // midpoints 10, 30, 50
        assert_eq!(resolve_drop_index(-5.0, &items), 0);
        assert_eq!(resolve_drop_index(12.0, &items), 1);
        assert_eq!(resolve_drop_index(49.0, &items), 2);
        assert_eq!(resolve_drop_index(51.0, &items), 3);
        assert_eq!(resolve_drop_index(0.0, &[]), 0);
    }

    #[test]
    fn drop_index_ties_insert_before_the_item() {
        let items = bounds(3);
        assert_eq!(resolve_drop_index(30.0, &items), 1);
    }

    #[test]
    fn dragging_from_catalog_inserts_at_pointer() {
        let mut selector = instance(&["a", "b"]);
        let controller = SelectorController::new(ConsistencyPolicy::Strict);
        let change = controller
            .drop_at(&mut selector, FieldId::new("e"), 15.0, &bounds(2))
            .expect("known field");
        assert_eq!(
            change,
            SelectorChange::Added {
                field_id: FieldId::new("e"),
                index: 1
            }
        );
        assert_eq!(order(&selector), vec!["a", "e", "b"]);
        assert!(selector.catalog().is_selected(&FieldId::new("e")));
    }

    #[derive(Debug, Clone)]
    enum Op {
        In(usize),
        Out(usize),
        Insert(usize, usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        // Index 6 is outside the catalog and must always be rejected.
        prop_oneof![
            (0usize..7).prop_map(Op::In),
            (0usize..7).prop_map(Op::Out),
            (0usize..10, 0usize..7).prop_map(|(index, id)| Op::Insert(index, id)),
        ]
    }

    fn field(index: usize) -> FieldId {
        FieldId::new(IDS.get(index).copied().unwrap_or("unknown"))
    }

    proptest! {
        #[test]
        fn selection_stays_unique_and_within_catalog(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut selector = instance(&[]);
            for op in ops {
                match op {
                    Op::In(id) => { let _ = selector.toggle_in(&field(id)); }
                    Op::Out(id) => { selector.toggle_out(&field(id)); }
                    Op::Insert(index, id) => { let _ = selector.insert_at(index, &field(id)); }
                }

                let ids = selector.to_array();
                let mut deduped = ids.clone();
                deduped.sort();
                deduped.dedup();
                prop_assert_eq!(deduped.len(), ids.len());
                for id in &ids {
                    prop_assert!(selector.catalog().contains(id));
                    prop_assert!(selector.catalog().is_selected(id));
                }
                let selected_in_catalog = selector
                    .catalog()
                    .entries()
                    .iter()
                    .filter(|entry| entry.is_selected())
                    .count();
                prop_assert_eq!(selected_in_catalog, ids.len());
            }
        }

        #[test]
        fn moving_preserves_length_and_relative_order(
            count in 1usize..6,
            from in 0usize..6,
            index in 0usize..8,
        ) {
            let initial: Vec<&str> = IDS[..count].to_vec();
            let mut selector = instance(&initial);
            let moved = field(from % count);
            let before = selector.to_array();

            selector.insert_at(index, &moved).expect("known field");
            let after = selector.to_array();

            prop_assert_eq!(after.len(), before.len());
            prop_assert!(after.contains(&moved));
            let others_before: Vec<&FieldId> = before.iter().filter(|id| **id != moved).collect();
            let others_after: Vec<&FieldId> = after.iter().filter(|id| **id != moved).collect();
            prop_assert_eq!(others_before, others_after);
        }
    }
}
