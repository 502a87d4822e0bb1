use crate::ui::catalog::FieldId;

/// Ordered, duplicate-free sequence of chosen field ids.
///
/// Catalog membership is not checked here; `SelectorInstance` is the only
/// mutator and validates ids before they reach the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionList {
    ids: Vec<FieldId>,
}

impl SelectionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, field_id: &FieldId) -> bool {
        self.position(field_id).is_some()
    }

    pub fn position(&self, field_id: &FieldId) -> Option<usize> {
        self.ids.iter().position(|id| id == field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldId> {
        self.ids.iter()
    }

    /// Appends `field_id` unless already present. Returns the index it was
    /// appended at.
    pub fn push(&mut self, field_id: FieldId) -> Option<usize> {
        if self.contains(&field_id) {
            return None;
        }
        self.ids.push(field_id);
        Some(self.ids.len() - 1)
    }

    /// Returns the index the id was removed from.
    pub fn remove(&mut self, field_id: &FieldId) -> Option<usize> {
        let position = self.position(field_id)?;
        self.ids.remove(position);
        Some(position)
    }

    /// Inserts or moves `field_id` so that it lands at `index`, where `index`
    /// is expressed against the list as it is now (clamped to `[0, len]`).
    ///
    /// For a move from an earlier position the target shifts down by one once
    /// the old slot is vacated. Returns `(previous_position, final_position)`.
    pub fn insert_at(&mut self, index: usize, field_id: FieldId) -> (Option<usize>, usize) {
        let index = index.min(self.ids.len());
        let previous = self.position(&field_id);

        let target = match previous {
            Some(old) => {
                self.ids.remove(old);
                if old < index {
                    index - 1
                } else {
                    index
                }
            }
            None => index,
        };

        let target = target.min(self.ids.len());
        self.ids.insert(target, field_id);
        (previous, target)
    }

    pub fn to_array(&self) -> Vec<FieldId> {
        self.ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> SelectionList {
        let mut selection = SelectionList::new();
        for id in ids {
            selection.push(FieldId::new(*id));
        }
        selection
    }

    fn ids(selection: &SelectionList) -> Vec<&str> {
        selection.iter().map(FieldId::as_str).collect()
    }

    #[test]
    fn push_is_idempotent() {
        let mut selection = list(&["a", "b"]);
        assert_eq!(selection.push(FieldId::new("a")), None);
        assert_eq!(ids(&selection), vec!["a", "b"]);
    }

    #[test]
    fn move_forward_lands_before_the_indicated_item() {
        let mut selection = list(&["a", "b", "c", "d"]);
        // Pointer resolved to "before d" (index 3) while dragging "a".
        let (previous, target) = selection.insert_at(3, FieldId::new("a"));
        assert_eq!(previous, Some(0));
        assert_eq!(target, 2);
        assert_eq!(ids(&selection), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn move_backward_uses_index_unchanged() {
        let mut selection = list(&["a", "b", "c", "d"]);
        let (_, target) = selection.insert_at(1, FieldId::new("d"));
        assert_eq!(target, 1);
        assert_eq!(ids(&selection), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn insert_index_is_clamped() {
        let mut selection = list(&["a"]);
        let (previous, target) = selection.insert_at(42, FieldId::new("z"));
        assert_eq!(previous, None);
        assert_eq!(target, 1);
        assert_eq!(ids(&selection), vec!["a", "z"]);

        let (_, target) = selection.insert_at(42, FieldId::new("a"));
        assert_eq!(target, 1);
        assert_eq!(ids(&selection), vec!["z", "a"]);
    }
}
