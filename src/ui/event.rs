use crate::ui::catalog::FieldId;
use crate::ui::delegate::ElementRef;
use crate::ui::search::SearchFilter;
use crate::ui::selector::ItemBounds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    /// A click bubbling up to `root`, described by the target's structure.
    Click { root: String, target: ElementRef },
    DragReleased {
        selector_id: String,
        field_id: FieldId,
        pointer_y: f32,
        items: Vec<ItemBounds>,
    },
    SearchInput { text: String, filter: SearchFilter },
    InputCommitted {
        form_id: String,
        name: String,
        value: String,
    },
    FormSubmitted { form_id: String },
    ConfirmationAnswered { link_id: String, accepted: bool },
}

impl UiEvent {
    pub fn to_log_line(&self) -> String {
        match self {
            Self::Click { root, target } => {
                format!("click root={root} target={}", target.describe())
            }
            Self::DragReleased {
                selector_id,
                field_id,
                pointer_y,
                items,
            } => format!(
                "drag_released selector_id={selector_id} field_id={field_id} pointer_y={pointer_y:.1} items={}",
                items.len()
            ),
            Self::SearchInput { text, filter } => {
                format!("search_input filter={} text={text}", filter.label())
            }
            Self::InputCommitted {
                form_id,
                name,
                value,
            } => format!("input_committed form_id={form_id} name={name} value={value}"),
            Self::FormSubmitted { form_id } => format!("form_submitted form_id={form_id}"),
            Self::ConfirmationAnswered { link_id, accepted } => {
                format!("confirmation_answered link_id={link_id} accepted={accepted}")
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UiEventLog {
    entries: Vec<UiEvent>,
}

impl UiEventLog {
    pub fn entries(&self) -> &[UiEvent] {
        &self.entries
    }

    pub fn push(&mut self, event: UiEvent) {
        tracing::trace!("{}", event.to_log_line());
        self.entries.push(event);
    }
}
