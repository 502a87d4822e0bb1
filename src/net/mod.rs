use crate::event::AppEvent;
use crate::ui::runtime::Effect;
use crate::ui::search::{RequestFailure, SearchOutcome};
use crate::ui::serializer::{FormSubmission, HttpMethod};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::mpsc;
use thiserror::Error;
use tokio::runtime::Handle;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("tokio runtime unavailable: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
    #[error("invalid base url `{url}`: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// A submission resolved against the base URL and shaped for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub body: Option<String>,
}

/// Method actually sent. With an override field configured, anything other
/// than GET and POST travels as POST; the real method is already in the body.
pub fn transport_method(method: &HttpMethod, override_field: Option<&str>) -> HttpMethod {
    match (method, override_field) {
        (HttpMethod::Get | HttpMethod::Post, _) | (_, None) => method.clone(),
        (_, Some(_)) => HttpMethod::Post,
    }
}

pub fn prepare(
    base_url: &Url,
    submission: &FormSubmission,
    override_field: Option<&str>,
) -> Result<PreparedRequest, url::ParseError> {
    let mut url = base_url.join(&submission.action)?;
    let method = transport_method(&submission.method, override_field);
    let body = if method.is_navigational() {
        if !submission.fields().is_empty() {
            url.query_pairs_mut().extend_pairs(submission.fields().iter());
        }
        None
    } else {
        Some(submission.encode_body())
    };
    Ok(PreparedRequest { method, url, body })
}

/// Performs runtime effects on the tokio runtime and reports back over the
/// app event channel.
#[derive(Clone)]
pub struct ConsoleClient {
    base_url: Url,
    http: Client,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
    method_override_field: Option<String>,
}

impl ConsoleClient {
    pub fn new(
        base_url: &str,
        method_override_field: Option<String>,
        tx: mpsc::Sender<AppEvent>,
    ) -> Result<Self, ClientError> {
        let runtime_handle = Handle::try_current()?;
        let base_url = Url::parse(base_url).map_err(|source| ClientError::BaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        let http = Client::builder()
            .user_agent(concat!("reportdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            http,
            tx,
            runtime_handle,
            method_override_field,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn perform(&self, effect: Effect) {
        match effect {
            Effect::IssueSearch { seq, submission } => self.search(seq, submission),
            Effect::Submit(submission) => self.submit(submission),
            Effect::Navigate(href) => self.navigate(href),
        }
    }

    fn prepare(&self, submission: &FormSubmission) -> Result<PreparedRequest, RequestFailure> {
        prepare(
            &self.base_url,
            submission,
            self.method_override_field.as_deref(),
        )
        .map_err(|err| RequestFailure::Transport(format!("bad action `{}`: {err}", submission.action)))
    }

    /// Never aborted; a superseded response is discarded by sequence number
    /// once it reaches the UI thread.
    pub fn search(&self, seq: u64, submission: FormSubmission) {
        let tx = self.tx.clone();
        let http = self.http.clone();
        let prepared = self.prepare(&submission);
        self.runtime_handle.spawn(async move {
            let outcome: SearchOutcome = match prepared {
                Ok(prepared) => match send(&http, prepared).await {
                    Ok((status, body)) if (200..300).contains(&status) => Ok(body),
                    Ok((status, _)) => Err(RequestFailure::Status(status)),
                    Err(failure) => Err(failure),
                },
                Err(failure) => Err(failure),
            };
            let _ = tx.send(AppEvent::SearchResolved { seq, outcome });
        });
    }

    pub fn submit(&self, submission: FormSubmission) {
        let tx = self.tx.clone();
        let http = self.http.clone();
        let prepared = self.prepare(&submission);
        self.runtime_handle.spawn(async move {
            let event = match prepared {
                Ok(prepared) => {
                    let url = prepared.url.to_string();
                    match send(&http, prepared).await {
                        Ok((status, _)) => AppEvent::SubmissionCompleted {
                            method: submission.method.to_string(),
                            url,
                            status,
                        },
                        Err(failure) => AppEvent::RequestFailed {
                            url,
                            message: failure.to_string(),
                        },
                    }
                }
                Err(failure) => AppEvent::RequestFailed {
                    url: submission.action.clone(),
                    message: failure.to_string(),
                },
            };
            let _ = tx.send(event);
        });
    }

    pub fn navigate(&self, href: String) {
        self.submit(FormSubmission::new(HttpMethod::Get, href));
    }
}

async fn send(http: &Client, prepared: PreparedRequest) -> Result<(u16, String), RequestFailure> {
    let method = reqwest::Method::from_bytes(prepared.method.as_str().as_bytes())
        .map_err(|err| RequestFailure::Transport(err.to_string()))?;
    tracing::debug!(method = %prepared.method, url = %prepared.url, "sending request");

    let mut request = http.request(method, prepared.url);
    if let Some(body) = prepared.body {
        request = request.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body);
    }
    let response = request
        .send()
        .await
        .map_err(|err| RequestFailure::Transport(err.to_string()))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|err| RequestFailure::Transport(err.to_string()))?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:5000/").expect("fixture url should parse")
    }

    #[test]
    fn override_field_turns_non_post_methods_into_post() {
        assert_eq!(
            transport_method(&HttpMethod::Delete, Some("_method")),
            HttpMethod::Post
        );
        assert_eq!(transport_method(&HttpMethod::Delete, None), HttpMethod::Delete);
        assert_eq!(
            transport_method(&HttpMethod::Get, Some("_method")),
            HttpMethod::Get
        );
    }

    #[test]
    fn post_submissions_carry_an_encoded_body() {
        let mut submission = FormSubmission::new(HttpMethod::Post, "/reports/search/");
        submission.push("filter_choices", "0");
        submission.push("search_text", "weekly intake");

        let prepared = prepare(&base(), &submission, None).expect("action should resolve");
        assert_eq!(prepared.url.as_str(), "http://127.0.0.1:5000/reports/search/");
        assert_eq!(
            prepared.body.as_deref(),
            Some("filter_choices=0&search_text=weekly+intake")
        );
    }

    #[test]
    fn get_requests_move_fields_into_the_query() {
        let mut submission = FormSubmission::new(HttpMethod::Get, "/reports/view/7/");
        let prepared = prepare(&base(), &submission, None).expect("action should resolve");
        assert_eq!(prepared.url.as_str(), "http://127.0.0.1:5000/reports/view/7/");
        assert!(prepared.body.is_none());

        submission.push("page", "2");
        let prepared = prepare(&base(), &submission, None).expect("action should resolve");
        assert_eq!(prepared.url.query(), Some("page=2"));
    }

    #[test]
    fn overridden_delete_is_sent_as_post() {
        let mut submission = FormSubmission::new(HttpMethod::Delete, "/reports/delete/7/");
        submission.push("csrf_token", "tok");
        submission.push("_method", "DELETE");

        let prepared =
            prepare(&base(), &submission, Some("_method")).expect("action should resolve");
        assert_eq!(prepared.method, HttpMethod::Post);
        assert_eq!(prepared.body.as_deref(), Some("csrf_token=tok&_method=DELETE"));
    }
}
