use crate::ui::search::SearchOutcome;

#[derive(Debug, Clone)]
pub enum AppEvent {
    SearchResolved {
        seq: u64,
        outcome: SearchOutcome,
    },
    SubmissionCompleted {
        method: String,
        url: String,
        status: u16,
    },
    RequestFailed {
        url: String,
        message: String,
    },
}
