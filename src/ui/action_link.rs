use crate::ui::serializer::{FormSubmission, HttpMethod};

/// A hyperlink annotated with `data-method` and an optional `data-confirm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLink {
    pub id: String,
    pub label: String,
    pub href: String,
    pub method: Option<HttpMethod>,
    pub confirm: Option<String>,
}

impl ActionLink {
    pub fn intercepted(&self) -> bool {
        self.method
            .as_ref()
            .is_some_and(|method| !method.is_navigational())
    }
}

/// Waiting on the user's answer. Nothing has been synthesized yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    link: ActionLink,
    message: String,
}

impl PendingAction {
    pub fn link(&self) -> &ActionLink {
        &self.link
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkActivation {
    Navigate(String),
    Confirm(PendingAction),
    Submit(FormSubmission),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Submitted(FormSubmission),
    Declined,
}

#[derive(Debug, Clone)]
pub struct ActionLinkController {
    csrf_field: String,
    csrf_token: String,
    method_override_field: Option<String>,
}

impl ActionLinkController {
    pub fn new(csrf_field: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            csrf_field: csrf_field.into(),
            csrf_token: csrf_token.into(),
            method_override_field: None,
        }
    }

    pub fn with_method_override(mut self, field: Option<String>) -> Self {
        self.method_override_field = field;
        self
    }

    pub fn set_token(&mut self, csrf_token: impl Into<String>) {
        self.csrf_token = csrf_token.into();
    }

    pub fn begin(&self, link: &ActionLink) -> LinkActivation {
        if !link.intercepted() {
            tracing::debug!(link = %link.id, href = %link.href, "link navigates normally");
            return LinkActivation::Navigate(link.href.clone());
        }

        match link
            .confirm
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
        {
            Some(message) => LinkActivation::Confirm(PendingAction {
                link: link.clone(),
                message: message.to_string(),
            }),
            None => LinkActivation::Submit(self.synthesize(link)),
        }
    }

    pub fn resolve(&self, pending: PendingAction, accepted: bool) -> LinkOutcome {
        if accepted {
            LinkOutcome::Submitted(self.synthesize(&pending.link))
        } else {
            tracing::info!(link = %pending.link.id, "action declined");
            LinkOutcome::Declined
        }
    }

    fn synthesize(&self, link: &ActionLink) -> FormSubmission {
        let method = link.method.clone().unwrap_or(HttpMethod::Post);
        let mut submission = FormSubmission::new(method, link.href.clone());
        submission.push(self.csrf_field.clone(), self.csrf_token.clone());
        if let Some(field) = &self.method_override_field {
            let method = submission.method.to_string();
            submission.push(field.clone(), method);
        }
        tracing::info!(link = %link.id, "{}", submission.to_log_line());
        submission
    }
}
