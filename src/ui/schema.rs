use crate::ui::action_link::ActionLink;
use crate::ui::catalog::{FieldId, RawFieldGroup};
use crate::ui::datepicker::{DatePickerOptions, DATEPICKER_CLASS};
use crate::ui::delegate::METHOD_ATTR;
use crate::ui::serializer::HttpMethod;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const MAX_ELEMENTS: usize = 256;
pub const MAX_DEPTH: usize = 4;

pub const CONFIRM_ATTR: &str = "confirm";
pub const FIELD_NAME_ATTR: &str = "field-name";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    Form,
    Input,
    Selector,
    Link,
    Search,
    Unknown(String),
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Form => "form",
            Self::Input => "input",
            Self::Selector => "selector",
            Self::Link => "link",
            Self::Search => "search",
            Self::Unknown(kind) => kind.as_str(),
        }
    }
}

impl<'de> Deserialize<'de> for ElementKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "form" => Self::Form,
            "input" => Self::Input,
            "selector" => Self::Selector,
            "link" => Self::Link,
            "search" => Self::Search,
            _ => Self::Unknown(raw),
        })
    }
}

/// One element of the server-rendered page, as markup would carry it: plain
/// attributes, a class list and `data-*` attributes (without the prefix).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawElement {
    pub id: String,
    pub kind: ElementKind,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub groups: Vec<RawFieldGroup>,
    #[serde(default)]
    pub selected: Vec<FieldId>,
    #[serde(default)]
    pub children: Vec<RawElement>,
}

impl RawElement {
    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|candidate| candidate == class)
    }

    fn data_attr(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSchema {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub title: Option<String>,
    pub csrf_token: String,
    #[serde(default)]
    pub datepicker: DatePickerOptions,
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct ValidatedPage {
    pub schema_version: u32,
    pub title: Option<String>,
    pub csrf_token: String,
    pub datepicker: DatePickerOptions,
    pub forms: Vec<FormElement>,
    pub links: Vec<ActionLink>,
    pub search: Option<SearchPanel>,
}

impl ValidatedPage {
    pub fn form(&self, form_id: &str) -> Option<&FormElement> {
        self.forms.iter().find(|form| form.id == form_id)
    }

    pub fn link(&self, link_id: &str) -> Option<&ActionLink> {
        self.links.iter().find(|link| link.id == link_id)
    }
}

#[derive(Debug, Clone)]
pub struct FormElement {
    pub id: String,
    pub title: Option<String>,
    pub action: String,
    pub method: HttpMethod,
    pub inputs: Vec<InputElement>,
    pub selectors: Vec<SelectorElement>,
}

#[derive(Debug, Clone)]
pub struct InputElement {
    pub id: String,
    pub name: String,
    pub label: String,
    pub value: String,
    pub is_date: bool,
}

#[derive(Debug, Clone)]
pub struct SelectorElement {
    pub id: String,
    pub label: Option<String>,
    pub field_name: String,
    pub groups: Vec<RawFieldGroup>,
    pub selected: Vec<FieldId>,
}

#[derive(Debug, Clone)]
pub struct SearchPanel {
    pub id: String,
    pub endpoint: String,
    pub label: Option<String>,
}

pub trait SchemaRegistry {
    fn supports_element(&self, kind: &ElementKind) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown element kind `{kind}` for element `{element_id}`")]
    UnknownElement { element_id: String, kind: String },
    #[error("missing required field `{field}` for element `{element_id}`")]
    MissingRequiredField {
        element_id: String,
        field: &'static str,
    },
    #[error("element `{element_id}` is missing data attribute `data-{attribute}`")]
    MissingDataAttribute {
        element_id: String,
        attribute: &'static str,
    },
    #[error("element `{element_id}` declares invalid method `{method}`")]
    InvalidMethod { element_id: String, method: String },
    #[error("element count {actual} exceeds max {max}")]
    TooManyElements { max: usize, actual: usize },
    #[error("element `{element_id}` nesting depth {actual} exceeds max {max}")]
    NestingTooDeep {
        max: usize,
        actual: usize,
        element_id: String,
    },
    #[error("duplicate element id `{element_id}`")]
    DuplicateElementId { element_id: String },
    #[error("element `{element_id}` must be inside a form")]
    OutsideForm { element_id: String },
    #[error("form `{form_id}` already has a field named `{name}`")]
    DuplicateFieldName { form_id: String, name: String },
    #[error("page declares more than one search panel (`{element_id}`)")]
    DuplicateSearchPanel { element_id: String },
}

fn required(
    value: &Option<String>,
    element_id: &str,
    field: &'static str,
) -> Result<String, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .ok_or(ValidationError::MissingRequiredField {
            element_id: element_id.to_string(),
            field,
        })
}

fn parse_method(raw: &str, element_id: &str) -> Result<HttpMethod, ValidationError> {
    raw.parse().map_err(|_| ValidationError::InvalidMethod {
        element_id: element_id.to_string(),
        method: raw.to_string(),
    })
}

struct Walk {
    element_counter: usize,
    ids: BTreeSet<String>,
    forms: Vec<FormElement>,
    links: Vec<ActionLink>,
    search: Option<SearchPanel>,
}

pub fn validate_page<R: SchemaRegistry>(
    page: &PageSchema,
    registry: &R,
) -> Result<ValidatedPage, ValidationError> {
    let mut walk = Walk {
        element_counter: 0,
        ids: BTreeSet::new(),
        forms: Vec::new(),
        links: Vec::new(),
        search: None,
    };

    validate_elements(&page.elements, registry, 1, None, &mut walk)?;

    Ok(ValidatedPage {
        schema_version: page.schema_version,
        title: page.title.clone(),
        csrf_token: page.csrf_token.clone(),
        datepicker: page.datepicker.clone(),
        forms: walk.forms,
        links: walk.links,
        search: walk.search,
    })
}

fn validate_elements<R: SchemaRegistry>(
    raw_elements: &[RawElement],
    registry: &R,
    depth: usize,
    mut form: Option<&mut FormElement>,
    walk: &mut Walk,
) -> Result<(), ValidationError> {
    for raw in raw_elements {
        walk.element_counter += 1;
        if walk.element_counter > MAX_ELEMENTS {
            return Err(ValidationError::TooManyElements {
                max: MAX_ELEMENTS,
                actual: walk.element_counter,
            });
        }

        if depth > MAX_DEPTH {
            return Err(ValidationError::NestingTooDeep {
                max: MAX_DEPTH,
                actual: depth,
                element_id: raw.id.clone(),
            });
        }

        if matches!(&raw.kind, ElementKind::Unknown(_)) || !registry.supports_element(&raw.kind) {
            return Err(ValidationError::UnknownElement {
                element_id: raw.id.clone(),
                kind: raw.kind.as_str().to_string(),
            });
        }

        if raw.id.trim().is_empty() {
            return Err(ValidationError::MissingRequiredField {
                element_id: raw.id.clone(),
                field: "id",
            });
        }
        if !walk.ids.insert(raw.id.clone()) {
            return Err(ValidationError::DuplicateElementId {
                element_id: raw.id.clone(),
            });
        }

        match &raw.kind {
            ElementKind::Form => {
                if form.is_some() {
                    return Err(ValidationError::NestingTooDeep {
                        max: 1,
                        actual: 2,
                        element_id: raw.id.clone(),
                    });
                }
                let method = match raw.method.as_deref() {
                    Some(method) => parse_method(method, &raw.id)?,
                    None => HttpMethod::Post,
                };
                let mut element = FormElement {
                    id: raw.id.clone(),
                    title: raw.label.clone(),
                    action: required(&raw.action, &raw.id, "action")?,
                    method,
                    inputs: Vec::new(),
                    selectors: Vec::new(),
                };
                validate_elements(&raw.children, registry, depth + 1, Some(&mut element), walk)?;
                walk.forms.push(element);
                continue;
            }
            ElementKind::Input => {
                let Some(form) = form.as_deref_mut() else {
                    return Err(ValidationError::OutsideForm {
                        element_id: raw.id.clone(),
                    });
                };
                let name = required(&raw.name, &raw.id, "name")?;
                ensure_unique_name(form, &name)?;
                form.inputs.push(InputElement {
                    id: raw.id.clone(),
                    label: raw.label.clone().unwrap_or_else(|| name.clone()),
                    name,
                    value: raw.value.clone().unwrap_or_default(),
                    is_date: raw.has_class(DATEPICKER_CLASS),
                });
            }
            ElementKind::Selector => {
                let Some(form) = form.as_deref_mut() else {
                    return Err(ValidationError::OutsideForm {
                        element_id: raw.id.clone(),
                    });
                };
                let field_name = raw
                    .data_attr(FIELD_NAME_ATTR)
                    .map(ToString::to_string)
                    .ok_or(ValidationError::MissingDataAttribute {
                        element_id: raw.id.clone(),
                        attribute: FIELD_NAME_ATTR,
                    })?;
                ensure_unique_name(form, &field_name)?;
                form.selectors.push(SelectorElement {
                    id: raw.id.clone(),
                    label: raw.label.clone(),
                    field_name,
                    groups: raw.groups.clone(),
                    selected: raw.selected.clone(),
                });
            }
            ElementKind::Link => {
                let method = raw
                    .data_attr(METHOD_ATTR)
                    .map(|method| parse_method(method, &raw.id))
                    .transpose()?;
                walk.links.push(ActionLink {
                    id: raw.id.clone(),
                    label: required(&raw.label, &raw.id, "label")?,
                    href: required(&raw.href, &raw.id, "href")?,
                    method,
                    confirm: raw.data_attr(CONFIRM_ATTR).map(ToString::to_string),
                });
            }
            ElementKind::Search => {
                if walk.search.is_some() {
                    return Err(ValidationError::DuplicateSearchPanel {
                        element_id: raw.id.clone(),
                    });
                }
                walk.search = Some(SearchPanel {
                    id: raw.id.clone(),
                    endpoint: required(&raw.endpoint, &raw.id, "endpoint")?,
                    label: raw.label.clone(),
                });
            }
            ElementKind::Unknown(kind) => {
                return Err(ValidationError::UnknownElement {
                    element_id: raw.id.clone(),
                    kind: kind.clone(),
                });
            }
        }

        validate_elements(&raw.children, registry, depth + 1, form.as_deref_mut(), walk)?;
    }

    Ok(())
}

fn ensure_unique_name(form: &FormElement, name: &str) -> Result<(), ValidationError> {
    let taken = form.inputs.iter().any(|input| input.name == name)
        || form.selectors.iter().any(|selector| selector.field_name == name);
    if taken {
        return Err(ValidationError::DuplicateFieldName {
            form_id: form.id.clone(),
            name: name.to_string(),
        });
    }
    Ok(())
}
