use crate::ui::catalog::FieldId;
use crate::ui::selector::SelectorInstance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Other(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Other(method) => method.as_str(),
        }
    }

    pub fn is_navigational(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let method = raw.trim().to_ascii_uppercase();
        if method.is_empty() || !method.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(format!("invalid http method `{raw}`"));
        }
        Ok(match method.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            _ => Self::Other(method),
        })
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A form submission as it would leave the page: method, action URL and an
/// ordered key/value body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub method: HttpMethod,
    pub action: String,
    fields: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn new(method: HttpMethod, action: impl Into<String>) -> Self {
        Self {
            method,
            action: action.into(),
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn remove_all(&mut self, name: &str) {
        self.fields.retain(|(key, _)| key != name);
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[cfg(test)]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn encode_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    pub fn to_log_line(&self) -> String {
        let keys: Vec<&str> = self.fields.iter().map(|(key, _)| key.as_str()).collect();
        format!(
            "form_submission method={} action={} keys={}",
            self.method,
            self.action,
            keys.join(",")
        )
    }
}

/// Joins ids under `ListEncoding::Comma`; field ids may not contain it.
pub const LIST_SEPARATOR: &str = ",";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListEncoding {
    /// `name=a,b,c`
    #[default]
    Comma,
    /// `name=a&name=b&name=c`
    Repeated,
}

/// Writes each selector's current order into a submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitSerializer {
    encoding: ListEncoding,
}

impl SubmitSerializer {
    pub fn new(encoding: ListEncoding) -> Self {
        Self { encoding }
    }

    pub fn write<'a>(
        &self,
        submission: &mut FormSubmission,
        instances: impl IntoIterator<Item = &'a SelectorInstance>,
    ) {
        for instance in instances {
            let name = instance.form_field_name();
            let ids = instance.to_array();
            submission.remove_all(name);
            match self.encoding {
                ListEncoding::Comma => {
                    let joined = ids
                        .iter()
                        .map(FieldId::as_str)
                        .collect::<Vec<_>>()
                        .join(LIST_SEPARATOR);
                    submission.push(name, joined);
                }
                ListEncoding::Repeated => {
                    for id in ids {
                        submission.push(name, id.as_str());
                    }
                }
            }
            tracing::debug!(
                selector = instance.id(),
                field = name,
                count = instance.selection().len(),
                "serialized selection"
            );
        }
    }

    #[cfg(test)]
    pub fn decode(&self, values: &[&str]) -> Vec<FieldId> {
        match self.encoding {
            ListEncoding::Comma => values
                .iter()
                .flat_map(|value| value.split(','))
                .filter(|id| !id.trim().is_empty())
                .map(FieldId::new)
                .collect(),
            ListEncoding::Repeated => values
                .iter()
                .filter(|id| !id.trim().is_empty())
                .map(|id| FieldId::new(*id))
                .collect(),
        }
    }
}
