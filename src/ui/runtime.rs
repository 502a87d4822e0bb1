use crate::theme::Theme;
use crate::ui::action_link::{ActionLinkController, LinkActivation, LinkOutcome, PendingAction};
use crate::ui::catalog::{CatalogLoadDiagnostic, FieldCatalog, FieldId};
use crate::ui::datepicker::DateInputState;
use crate::ui::delegate::{
    DelegatedAction, DelegationRegistry, ElementPredicate, ElementRef, ADD_FIELD_CLASS,
    DOCUMENT_ROOT, FIELD_ID_ATTR, LINK_ID_ATTR, METHOD_ATTR, REMOVE_FIELD_CLASS,
};
use crate::ui::event::{UiEvent, UiEventLog};
use crate::ui::registry::{ComponentRegistry, PageView};
use crate::ui::schema::{validate_page, PageSchema, ValidatedPage, ValidationError};
use crate::ui::search::{Resolution, SearchController, SearchOutcome, SearchQuery, SearchRequest};
use crate::ui::selector::{
    ConsistencyError, ConsistencyPolicy, SelectorCommand, SelectorController, SelectorInstance,
};
use crate::ui::serializer::{FormSubmission, HttpMethod, ListEncoding, SubmitSerializer};
use chrono::{Local, NaiveDate};
use eframe::egui::{self, RichText};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("page deserialize error: {0}")]
    Deserialize(String),
    #[error("page validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error("no page is loaded")]
    NoPage,
    #[error("no form `{0}` on this page")]
    UnknownForm(String),
    #[error("no link `{0}` on this page")]
    UnknownLink(String),
}

/// Work the runtime hands back to the shell after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    IssueSearch { seq: u64, submission: FormSubmission },
    Submit(FormSubmission),
    Navigate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub csrf_field: String,
    pub method_override_field: Option<String>,
    pub list_encoding: ListEncoding,
    pub consistency: ConsistencyPolicy,
    pub search_debounce: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            csrf_field: "csrf_token".to_string(),
            method_override_field: None,
            list_encoding: ListEncoding::default(),
            consistency: ConsistencyPolicy::default(),
            search_debounce: Duration::from_millis(250),
        }
    }
}

pub fn input_key(form_id: &str, name: &str) -> String {
    format!("{form_id}::{name}")
}

/// Owns everything one loaded page needs and turns `UiEvent`s into state
/// changes plus `Effect`s. Only the UI thread touches it.
pub struct PageRuntime {
    registry: ComponentRegistry,
    settings: PageSettings,
    page: Option<ValidatedPage>,
    runtime_error: Option<RuntimeError>,
    selectors: Vec<SelectorInstance>,
    controller: SelectorController,
    delegation: DelegationRegistry,
    serializer: SubmitSerializer,
    links: ActionLinkController,
    search: SearchController,
    search_query: SearchQuery,
    input_state: BTreeMap<String, String>,
    date_state: BTreeMap<String, DateInputState>,
    pending_confirmation: Option<PendingAction>,
    catalog_diagnostics: Vec<CatalogLoadDiagnostic>,
    event_log: UiEventLog,
    today: Option<NaiveDate>,
}

impl PageRuntime {
    pub fn new(settings: PageSettings) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            controller: SelectorController::new(settings.consistency),
            serializer: SubmitSerializer::new(settings.list_encoding),
            links: ActionLinkController::new(settings.csrf_field.clone(), String::new())
                .with_method_override(settings.method_override_field.clone()),
            search: SearchController::new(settings.search_debounce),
            settings,
            page: None,
            runtime_error: None,
            selectors: Vec::new(),
            delegation: DelegationRegistry::new(),
            search_query: SearchQuery::default(),
            input_state: BTreeMap::new(),
            date_state: BTreeMap::new(),
            pending_confirmation: None,
            catalog_diagnostics: Vec::new(),
            event_log: UiEventLog::default(),
            today: None,
        }
    }

    pub fn load_page_json(&mut self, raw_page: &str) -> Result<(), RuntimeError> {
        self.reset();
        let parsed: PageSchema = match serde_json::from_str(raw_page) {
            Ok(page) => page,
            Err(err) => return Err(self.fail(RuntimeError::Deserialize(err.to_string()))),
        };
        self.load_page(parsed)
    }

    fn reset(&mut self) {
        self.page = None;
        self.runtime_error = None;
        self.selectors.clear();
        self.delegation.clear();
        self.search = SearchController::new(self.settings.search_debounce);
        self.search_query = SearchQuery::default();
        self.input_state.clear();
        self.date_state.clear();
        self.pending_confirmation = None;
        self.catalog_diagnostics.clear();
    }

    fn fail(&mut self, error: RuntimeError) -> RuntimeError {
        tracing::error!(%error, "page failed to load");
        self.runtime_error = Some(error.clone());
        error
    }

    fn load_page(&mut self, page: PageSchema) -> Result<(), RuntimeError> {
        let validated = match validate_page(&page, &self.registry) {
            Ok(validated) => validated,
            Err(err) => return Err(self.fail(err.into())),
        };

        if let Err(err) = self.build_selectors(&validated) {
            self.selectors.clear();
            return Err(self.fail(err.into()));
        }

        for form in &validated.forms {
            for input in &form.inputs {
                let key = input_key(&form.id, &input.name);
                self.input_state.insert(key.clone(), input.value.clone());
                if input.is_date {
                    self.date_state.insert(key, DateInputState::default());
                }
            }
        }

        self.subscribe_delegates();
        self.links.set_token(validated.csrf_token.clone());
        tracing::info!(
            schema_version = validated.schema_version,
            forms = validated.forms.len(),
            selectors = self.selectors.len(),
            links = validated.links.len(),
            delegates = self.delegation.len(),
            "page loaded"
        );
        self.page = Some(validated);
        Ok(())
    }

    fn build_selectors(&mut self, page: &ValidatedPage) -> Result<(), ConsistencyError> {
        for form in &page.forms {
            for element in &form.selectors {
                let (catalog, diagnostics) = FieldCatalog::from_groups(&element.id, &element.groups);
                for diagnostic in &diagnostics {
                    tracing::warn!("{}", diagnostic.to_log_line());
                }
                self.catalog_diagnostics.extend(diagnostics);

                let initial: Vec<FieldId> = match self.settings.consistency {
                    ConsistencyPolicy::Strict => element.selected.clone(),
                    ConsistencyPolicy::Lenient => element
                        .selected
                        .iter()
                        .filter(|field_id| {
                            let known = catalog.contains(field_id);
                            if !known {
                                tracing::warn!(
                                    selector = %element.id,
                                    field = %field_id,
                                    "dropped unknown initial selection"
                                );
                            }
                            known
                        })
                        .cloned()
                        .collect(),
                };

                self.selectors.push(SelectorInstance::new(
                    element.id.clone(),
                    form.id.clone(),
                    element.field_name.clone(),
                    catalog,
                    &initial,
                )?);
            }
        }
        Ok(())
    }

    fn subscribe_delegates(&mut self) {
        for selector in &self.selectors {
            self.delegation.subscribe(
                selector.id(),
                ElementPredicate::All(vec![
                    ElementPredicate::HasClass(REMOVE_FIELD_CLASS.to_string()),
                    ElementPredicate::HasData(FIELD_ID_ATTR.to_string()),
                ]),
                DelegatedAction::RemoveField,
            );
            self.delegation.subscribe(
                selector.id(),
                ElementPredicate::All(vec![
                    ElementPredicate::HasClass(ADD_FIELD_CLASS.to_string()),
                    ElementPredicate::HasData(FIELD_ID_ATTR.to_string()),
                ]),
                DelegatedAction::AddField,
            );
        }
        self.delegation.subscribe(
            DOCUMENT_ROOT,
            ElementPredicate::All(vec![
                ElementPredicate::Tag("a".to_string()),
                ElementPredicate::HasData(METHOD_ATTR.to_string()),
                ElementPredicate::HasData(LINK_ID_ATTR.to_string()),
            ]),
            DelegatedAction::ActivateLink,
        );
    }

    #[cfg(test)]
    pub fn page(&self) -> Option<&ValidatedPage> {
        self.page.as_ref()
    }

    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        self.runtime_error.as_ref()
    }

    pub fn event_log(&self) -> &[UiEvent] {
        self.event_log.entries()
    }

    pub fn catalog_diagnostics(&self) -> &[CatalogLoadDiagnostic] {
        &self.catalog_diagnostics
    }

    #[cfg(test)]
    pub fn selector(&self, selector_id: &str) -> Option<&SelectorInstance> {
        self.selectors.iter().find(|selector| selector.id() == selector_id)
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn pending_confirmation(&self) -> Option<&PendingAction> {
        self.pending_confirmation.as_ref()
    }

    #[cfg(test)]
    pub fn date_state(&self, form_id: &str, name: &str) -> Option<&DateInputState> {
        self.date_state.get(&input_key(form_id, name))
    }

    /// Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.search.next_deadline()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn dispatch(&mut self, event: UiEvent, now: Instant) -> Result<Vec<Effect>, RuntimeError> {
        self.event_log.push(event.clone());
        let Some(page) = self.page.as_ref() else {
            return Err(RuntimeError::NoPage);
        };

        // An open confirmation prompt holds the page until it is answered.
        if let Some(pending) = &self.pending_confirmation {
            if !matches!(event, UiEvent::ConfirmationAnswered { .. }) {
                tracing::debug!(
                    pending = %pending.link().id,
                    event = %event.to_log_line(),
                    "event ignored while awaiting confirmation"
                );
                return Ok(Vec::new());
            }
        }
        let has_search_panel = page.search.is_some();

        match event {
            UiEvent::Click { root, target } => {
                let Some(delegated) = self.delegation.dispatch(&root, &target) else {
                    return Ok(self.default_action(&target).into_iter().collect());
                };
                match (delegated.action, delegated.field_id, delegated.link_id) {
                    (DelegatedAction::RemoveField, Some(field_id), _) => {
                        self.apply_selector(&root, SelectorCommand::ToggleOut(field_id))
                    }
                    (DelegatedAction::AddField, Some(field_id), _) => {
                        self.apply_selector(&root, SelectorCommand::ToggleIn(field_id))
                    }
                    (DelegatedAction::ActivateLink, _, Some(link_id)) => self.activate_link(&link_id),
                    _ => Ok(Vec::new()),
                }
            }
            UiEvent::DragReleased {
                selector_id,
                field_id,
                pointer_y,
                items,
            } => {
                let controller = self.controller;
                let Some(instance) = self
                    .selectors
                    .iter_mut()
                    .find(|selector| selector.id() == selector_id)
                else {
                    return self.surface(ConsistencyError::UnknownSelector { selector_id });
                };
                controller.drop_at(instance, field_id, pointer_y, &items)?;
                Ok(Vec::new())
            }
            UiEvent::SearchInput { text, filter } => {
                if !has_search_panel {
                    tracing::debug!("search input on a page without a search panel");
                    return Ok(Vec::new());
                }
                let query = SearchQuery { text, filter };
                self.search_query = query.clone();
                Ok(self
                    .search
                    .input_changed(query, now)
                    .and_then(|request| self.search_effect(request))
                    .into_iter()
                    .collect())
            }
            UiEvent::InputCommitted {
                form_id,
                name,
                value,
            } => {
                self.commit_input(&form_id, &name, value);
                Ok(Vec::new())
            }
            UiEvent::FormSubmitted { form_id } => self.submit_form(&form_id),
            UiEvent::ConfirmationAnswered { link_id, accepted } => {
                let Some(pending) = self.pending_confirmation.take() else {
                    tracing::warn!(link = %link_id, "confirmation answered with nothing pending");
                    return Ok(Vec::new());
                };
                if pending.link().id != link_id {
                    tracing::warn!(
                        link = %link_id,
                        pending = %pending.link().id,
                        "confirmation answered for a different link"
                    );
                    self.pending_confirmation = Some(pending);
                    return Ok(Vec::new());
                }
                Ok(match self.links.resolve(pending, accepted) {
                    LinkOutcome::Submitted(submission) => vec![Effect::Submit(submission)],
                    LinkOutcome::Declined => Vec::new(),
                })
            }
        }
    }

    /// Releases a debounced search once its quiet period has elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        self.search
            .poll(now)
            .and_then(|request| self.search_effect(request))
            .into_iter()
            .collect()
    }

    pub fn apply_search_outcome(&mut self, seq: u64, outcome: SearchOutcome) -> Resolution {
        self.search.resolve(seq, outcome)
    }

    fn search_effect(&self, request: SearchRequest) -> Option<Effect> {
        let page = self.page.as_ref()?;
        let Some(panel) = &page.search else {
            tracing::debug!("page has no search panel");
            return None;
        };
        let mut submission = FormSubmission::new(HttpMethod::Post, panel.endpoint.clone());
        for (name, value) in request.form_fields(&self.settings.csrf_field, &page.csrf_token) {
            submission.push(name, value);
        }
        Some(Effect::IssueSearch {
            seq: request.seq,
            submission,
        })
    }

    fn apply_selector(
        &mut self,
        selector_id: &str,
        command: SelectorCommand,
    ) -> Result<Vec<Effect>, RuntimeError> {
        let controller = self.controller;
        let Some(instance) = self
            .selectors
            .iter_mut()
            .find(|selector| selector.id() == selector_id)
        else {
            return self.surface(ConsistencyError::UnknownSelector {
                selector_id: selector_id.to_string(),
            });
        };
        controller.apply(instance, command)?;
        Ok(Vec::new())
    }

    fn surface(&self, err: ConsistencyError) -> Result<Vec<Effect>, RuntimeError> {
        match self.controller.policy() {
            ConsistencyPolicy::Strict => {
                tracing::error!(%err, "rejected event");
                Err(err.into())
            }
            ConsistencyPolicy::Lenient => {
                tracing::warn!(%err, "ignored event");
                Ok(Vec::new())
            }
        }
    }

    fn activate_link(&mut self, link_id: &str) -> Result<Vec<Effect>, RuntimeError> {
        let link = self
            .page
            .as_ref()
            .and_then(|page| page.link(link_id))
            .ok_or_else(|| RuntimeError::UnknownLink(link_id.to_string()))?;

        Ok(match self.links.begin(link) {
            LinkActivation::Navigate(href) => vec![Effect::Navigate(href)],
            LinkActivation::Submit(submission) => vec![Effect::Submit(submission)],
            LinkActivation::Confirm(pending) => {
                tracing::debug!(link = %link_id, "awaiting confirmation");
                self.pending_confirmation = Some(pending);
                Vec::new()
            }
        })
    }

    /// What an unhandled click does on its own: links navigate.
    fn default_action(&self, target: &ElementRef) -> Option<Effect> {
        let link = target
            .data(LINK_ID_ATTR)
            .filter(|_| target.tag.eq_ignore_ascii_case("a"))
            .and_then(|link_id| self.page.as_ref()?.link(link_id));
        match link {
            Some(link) => {
                tracing::debug!(link = %link.id, href = %link.href, "default navigation");
                Some(Effect::Navigate(link.href.clone()))
            }
            None => {
                tracing::trace!(target = %target.describe(), "click not delegated");
                None
            }
        }
    }

    /// Valid dates are stored in the picker's canonical rendering.
    fn commit_input(&mut self, form_id: &str, name: &str, mut value: String) {
        let key = input_key(form_id, name);
        let today = self.today();
        if let (Some(state), Some(page)) = (self.date_state.get_mut(&key), self.page.as_ref()) {
            if value.trim().is_empty() {
                state.error = None;
            } else {
                match state.commit(&page.datepicker, &value, today) {
                    Ok(date) => value = page.datepicker.render(date),
                    Err(err) => {
                        tracing::debug!(form = form_id, field = name, %err, "rejected date input")
                    }
                }
            }
        }
        self.input_state.insert(key, value);
    }

    fn submit_form(&mut self, form_id: &str) -> Result<Vec<Effect>, RuntimeError> {
        let page = self.page.as_ref().ok_or(RuntimeError::NoPage)?;
        let form = page
            .form(form_id)
            .ok_or_else(|| RuntimeError::UnknownForm(form_id.to_string()))?;

        let invalid_dates = form.inputs.iter().any(|input| {
            self.date_state
                .get(&input_key(&form.id, &input.name))
                .is_some_and(|state| state.error.is_some())
        });
        if invalid_dates {
            tracing::warn!(form = form_id, "submission blocked by an invalid date");
            return Ok(Vec::new());
        }

        let mut submission = FormSubmission::new(form.method.clone(), form.action.clone());
        submission.push(self.settings.csrf_field.clone(), page.csrf_token.clone());
        for input in &form.inputs {
            let value = self
                .input_state
                .get(&input_key(&form.id, &input.name))
                .cloned()
                .unwrap_or_default();
            submission.push(input.name.clone(), value);
        }
        self.serializer.write(
            &mut submission,
            self.selectors
                .iter()
                .filter(|selector| selector.form_id() == form.id),
        );

        tracing::info!("{}", submission.to_log_line());
        Ok(vec![Effect::Submit(submission)])
    }

    /// Draws the page and returns the events raised while doing so. The caller
    /// dispatches them once rendering has released its borrows.
    pub fn render_page(&mut self, ui: &mut egui::Ui, theme: &Theme) -> Vec<UiEvent> {
        if let Some(error) = &self.runtime_error {
            theme.card_frame().show(ui, |ui| {
                ui.label(
                    RichText::new("Page failed to load")
                        .color(theme.error)
                        .size(13.0),
                );
                ui.add_space(theme.gap);
                ui.label(
                    RichText::new(error.to_string())
                        .color(theme.text_muted)
                        .size(12.0),
                );
            });
            return Vec::new();
        }

        let Some(page) = self.page.as_ref() else {
            return Vec::new();
        };

        let mut emitted = Vec::new();
        let view = PageView {
            page,
            selectors: &self.selectors,
            search: &self.search,
            search_query: &self.search_query,
            date_state: &self.date_state,
        };
        self.registry
            .render_page(&view, &mut self.input_state, ui, theme, &mut |event| {
                emitted.push(event)
            });
        emitted
    }

    #[cfg(test)]
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = Some(today);
    }

    #[cfg(test)]
    pub fn simulate_remove_click(
        &mut self,
        selector_id: &str,
        field_id: &str,
    ) -> Result<Vec<Effect>, RuntimeError> {
        let target = ElementRef::new("button")
            .with_class(REMOVE_FIELD_CLASS)
            .with_data(FIELD_ID_ATTR, field_id);
        self.dispatch(
            UiEvent::Click {
                root: selector_id.to_string(),
                target,
            },
            Instant::now(),
        )
    }

    #[cfg(test)]
    pub fn simulate_add_click(
        &mut self,
        selector_id: &str,
        field_id: &str,
    ) -> Result<Vec<Effect>, RuntimeError> {
        let target = ElementRef::new("button")
            .with_class(ADD_FIELD_CLASS)
            .with_data(FIELD_ID_ATTR, field_id);
        self.dispatch(
            UiEvent::Click {
                root: selector_id.to_string(),
                target,
            },
            Instant::now(),
        )
    }

    #[cfg(test)]
    pub fn simulate_link_click(&mut self, link_id: &str) -> Result<Vec<Effect>, RuntimeError> {
        let link = self
            .page
            .as_ref()
            .and_then(|page| page.link(link_id))
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownLink(link_id.to_string()))?;
        let mut target = ElementRef::new("a").with_data(LINK_ID_ATTR, link_id);
        if let Some(method) = &link.method {
            target = target.with_data(METHOD_ATTR, method.as_str());
        }
        self.dispatch(
            UiEvent::Click {
                root: DOCUMENT_ROOT.to_string(),
                target,
            },
            Instant::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::search::{RequestFailure, SearchFilter};
    use crate::ui::selector::ItemBounds;

    const DEMO_PAGE: &str = include_str!("pages/create_report.json");

    fn settings() -> PageSettings {
        PageSettings {
            consistency: ConsistencyPolicy::Strict,
            search_debounce: Duration::ZERO,
            ..PageSettings::default()
        }
    }

    fn runtime_with(settings: PageSettings) -> PageRuntime {
        let mut runtime = PageRuntime::new(settings);
        runtime.load_page_json(DEMO_PAGE).expect("demo page should load");
        runtime
    }

    fn runtime() -> PageRuntime {
        runtime_with(settings())
    }

    fn selection(runtime: &PageRuntime, selector_id: &str) -> Vec<String> {
        runtime
            .selector(selector_id)
            .expect("selector present")
            .to_array()
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    fn only_submission(effects: Vec<Effect>) -> FormSubmission {
        match effects.as_slice() {
            [Effect::Submit(submission)] => submission.clone(),
            other => panic!("expected exactly one submission, got {other:?}"),
        }
    }

    fn bounds(count: usize) -> Vec<ItemBounds> {
        (0..count)
            .map(|index| ItemBounds {
                top: index as f32 * 20.0,
                bottom: index as f32 * 20.0 + 20.0,
            })
            .collect()
    }

    #[test]
    fn initial_selection_comes_from_the_page() {
        let runtime = runtime();
        assert_eq!(selection(&runtime, "report_fields"), vec!["102", "201"]);
        assert!(selection(&runtime, "chart_fields").is_empty());

        let report = runtime.selector("report_fields").expect("selector present");
        assert!(report.catalog().is_selected(&FieldId::new("102")));
        assert!(!report.catalog().is_selected(&FieldId::new("101")));
    }

    #[test]
    fn remove_then_add_moves_field_to_the_end() {
        let mut runtime = runtime();
        runtime
            .simulate_remove_click("report_fields", "102")
            .expect("remove should apply");
        runtime
            .simulate_add_click("report_fields", "102")
            .expect("add should apply");
        assert_eq!(selection(&runtime, "report_fields"), vec!["201", "102"]);
    }

    #[test]
    fn selectors_on_one_page_are_independent() {
        let mut runtime = runtime();
        runtime
            .simulate_add_click("chart_fields", "202")
            .expect("add should apply");
        assert_eq!(selection(&runtime, "chart_fields"), vec!["202"]);
        assert_eq!(selection(&runtime, "report_fields"), vec!["102", "201"]);
        assert!(!runtime
            .selector("report_fields")
            .expect("selector present")
            .catalog()
            .is_selected(&FieldId::new("202")));
    }

    #[test]
    fn drag_release_reorders_by_pointer_position() {
        let mut runtime = runtime();
        runtime
            .simulate_add_click("report_fields", "301")
            .expect("add should apply");
        assert_eq!(selection(&runtime, "report_fields"), vec!["102", "201", "301"]);

        // Pointer above the first midpoint: 301 goes first.
        runtime
            .dispatch(
                UiEvent::DragReleased {
                    selector_id: "report_fields".to_string(),
                    field_id: FieldId::new("301"),
                    pointer_y: 5.0,
                    items: bounds(3),
                },
                Instant::now(),
            )
            .expect("drop should apply");
        assert_eq!(selection(&runtime, "report_fields"), vec!["301", "102", "201"]);
    }

    #[test]
    fn unknown_field_surfaces_per_policy() {
        let mut strict = runtime();
        let err = strict
            .simulate_add_click("report_fields", "999")
            .expect_err("strict policy should reject unknown ids");
        assert!(matches!(
            err,
            RuntimeError::Consistency(ConsistencyError::UnknownField { .. })
        ));

        let mut lenient = runtime_with(PageSettings {
            consistency: ConsistencyPolicy::Lenient,
            ..settings()
        });
        assert_eq!(
            lenient.simulate_add_click("report_fields", "999"),
            Ok(Vec::new())
        );
        assert_eq!(selection(&lenient, "report_fields"), vec!["102", "201"]);
    }

    #[test]
    fn submit_writes_selection_in_user_order() {
        let mut runtime = runtime();
        runtime
            .simulate_add_click("report_fields", "101")
            .expect("add should apply");
        runtime
            .dispatch(
                UiEvent::DragReleased {
                    selector_id: "report_fields".to_string(),
                    field_id: FieldId::new("201"),
                    pointer_y: 0.0,
                    items: bounds(3),
                },
                Instant::now(),
            )
            .expect("drop should apply");
        runtime
            .dispatch(
                UiEvent::InputCommitted {
                    form_id: "create_report".to_string(),
                    name: "name".to_string(),
                    value: "Weekly intake".to_string(),
                },
                Instant::now(),
            )
            .expect("input should commit");

        let submission = only_submission(
            runtime
                .dispatch(
                    UiEvent::FormSubmitted {
                        form_id: "create_report".to_string(),
                    },
                    Instant::now(),
                )
                .expect("form should submit"),
        );
        assert_eq!(submission.method, HttpMethod::Post);
        assert_eq!(submission.action, "/reports/create/");
        assert_eq!(submission.get("fields"), Some("201,102,101"));
        assert_eq!(submission.get("name"), Some("Weekly intake"));
        assert_eq!(submission.get("csrf_token"), Some("demo-csrf-token"));
        assert_eq!(submission.get("chart_fields"), None);
    }

    #[test]
    fn repeated_encoding_applies_to_form_submission() {
        let mut runtime = runtime_with(PageSettings {
            list_encoding: ListEncoding::Repeated,
            ..settings()
        });
        let submission = only_submission(
            runtime
                .dispatch(
                    UiEvent::FormSubmitted {
                        form_id: "create_report".to_string(),
                    },
                    Instant::now(),
                )
                .expect("form should submit"),
        );
        assert_eq!(submission.get_all("fields"), vec!["102", "201"]);
    }

    #[test]
    fn invalid_date_blocks_submission_until_corrected() {
        let mut runtime = runtime();
        runtime.set_today(NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"));
        let commit = |runtime: &mut PageRuntime, value: &str| {
            runtime
                .dispatch(
                    UiEvent::InputCommitted {
                        form_id: "create_chart".to_string(),
                        name: "end_date".to_string(),
                        value: value.to_string(),
                    },
                    Instant::now(),
                )
                .expect("input should commit");
        };
        let submit = |runtime: &mut PageRuntime| {
            runtime
                .dispatch(
                    UiEvent::FormSubmitted {
                        form_id: "create_chart".to_string(),
                    },
                    Instant::now(),
                )
                .expect("submit should not error")
        };

        commit(&mut runtime, "2030-01-01");
        assert!(runtime
            .date_state("create_chart", "end_date")
            .and_then(|state| state.error.as_ref())
            .is_some());
        assert!(submit(&mut runtime).is_empty());

        commit(&mut runtime, " 2024-03-01 ");
        let submission = only_submission(submit(&mut runtime));
        assert_eq!(submission.get("end_date"), Some("2024-03-01"));
        assert_eq!(submission.get("chart_fields"), Some(""));
    }

    #[test]
    fn out_of_order_search_responses_keep_latest_results() {
        let mut runtime = runtime();
        let issue = |runtime: &mut PageRuntime, text: &str| -> u64 {
            let effects = runtime
                .dispatch(
                    UiEvent::SearchInput {
                        text: text.to_string(),
                        filter: SearchFilter::OwnerEmail,
                    },
                    Instant::now(),
                )
                .expect("search input should dispatch");
            match effects.as_slice() {
                [Effect::IssueSearch { seq, submission }] => {
                    assert_eq!(submission.action, "/reports/search/");
                    assert_eq!(submission.get("filter_choices"), Some("2"));
                    assert_eq!(submission.get("search_text"), Some(text));
                    assert_eq!(submission.get("csrf_token"), Some("demo-csrf-token"));
                    *seq
                }
                other => panic!("expected one search, got {other:?}"),
            }
        };

        let t1 = issue(&mut runtime, "ann");
        let t2 = issue(&mut runtime, "anna");
        assert!(runtime.search().is_busy());

        assert_eq!(
            runtime.apply_search_outcome(t2, Ok("<li>anna@example.org</li>".to_string())),
            Resolution::Applied
        );
        assert!(matches!(
            runtime.apply_search_outcome(t1, Ok("<li>ann@example.org</li>".to_string())),
            Resolution::Stale { .. }
        ));
        assert_eq!(runtime.search().results(), Some("<li>anna@example.org</li>"));
        assert!(!runtime.search().is_busy());

        let t3 = issue(&mut runtime, "annab");
        runtime.apply_search_outcome(t3, Err(RequestFailure::Status(502)));
        assert_eq!(runtime.search().results(), Some("<li>anna@example.org</li>"));
    }

    #[test]
    fn debounced_search_is_released_by_tick() {
        let mut runtime = runtime_with(PageSettings {
            search_debounce: Duration::from_millis(250),
            ..settings()
        });
        let start = Instant::now();
        let effects = runtime
            .dispatch(
                UiEvent::SearchInput {
                    text: "q".to_string(),
                    filter: SearchFilter::ReportName,
                },
                start,
            )
            .expect("search input should dispatch");
        assert!(effects.is_empty());
        assert!(runtime.next_deadline().is_some());
        assert!(runtime.tick(start + Duration::from_millis(100)).is_empty());
        assert_eq!(runtime.tick(start + Duration::from_millis(300)).len(), 1);
    }

    #[test]
    fn delete_link_waits_for_confirmation() {
        let mut declined = runtime();
        assert!(declined
            .simulate_link_click("delete_report_7")
            .expect("click should dispatch")
            .is_empty());
        assert_eq!(
            declined.pending_confirmation().map(PendingAction::message),
            Some("Delete this report and all of its charts?")
        );
        let effects = declined
            .dispatch(
                UiEvent::ConfirmationAnswered {
                    link_id: "delete_report_7".to_string(),
                    accepted: false,
                },
                Instant::now(),
            )
            .expect("answer should dispatch");
        assert!(effects.is_empty());
        assert!(declined.pending_confirmation().is_none());

        let mut accepted = runtime();
        accepted
            .simulate_link_click("delete_report_7")
            .expect("click should dispatch");
        let submission = only_submission(
            accepted
                .dispatch(
                    UiEvent::ConfirmationAnswered {
                        link_id: "delete_report_7".to_string(),
                        accepted: true,
                    },
                    Instant::now(),
                )
                .expect("answer should dispatch"),
        );
        assert_eq!(submission.method, HttpMethod::Delete);
        assert_eq!(submission.action, "/reports/delete/7/");
        assert_eq!(submission.get("csrf_token"), Some("demo-csrf-token"));
    }

    #[test]
    fn pending_confirmation_holds_every_other_event() {
        let mut runtime = runtime();
        runtime
            .simulate_link_click("delete_report_7")
            .expect("click should dispatch");

        assert!(runtime
            .simulate_link_click("favorite_report_7")
            .expect("click should dispatch")
            .is_empty());
        assert!(runtime
            .dispatch(
                UiEvent::FormSubmitted {
                    form_id: "create_report".to_string()
                },
                Instant::now()
            )
            .expect("submit should dispatch")
            .is_empty());
        assert!(runtime
            .simulate_remove_click("report_fields", "201")
            .expect("remove should dispatch")
            .is_empty());
        assert_eq!(selection(&runtime, "report_fields"), vec!["102", "201"]);
        assert_eq!(
            runtime
                .pending_confirmation()
                .map(|pending| pending.link().id.as_str()),
            Some("delete_report_7")
        );

        let submission = only_submission(
            runtime
                .dispatch(
                    UiEvent::ConfirmationAnswered {
                        link_id: "delete_report_7".to_string(),
                        accepted: true,
                    },
                    Instant::now(),
                )
                .expect("answer should dispatch"),
        );
        assert_eq!(submission.method, HttpMethod::Delete);

        let favorite = only_submission(
            runtime
                .simulate_link_click("favorite_report_7")
                .expect("click should dispatch"),
        );
        assert_eq!(favorite.method, HttpMethod::Post);
    }

    #[test]
    fn search_input_without_search_panel_stays_idle() {
        let page = r#"{
            "csrf_token": "tok",
            "elements": [
                {
                    "id": "notes",
                    "kind": "form",
                    "action": "/notes/",
                    "children": [{ "id": "note_text", "kind": "input", "name": "text" }]
                }
            ]
        }"#;
        let mut runtime = PageRuntime::new(settings());
        runtime
            .load_page_json(page)
            .expect("page without a search panel should load");

        let effects = runtime
            .dispatch(
                UiEvent::SearchInput {
                    text: "enrol".to_string(),
                    filter: SearchFilter::default(),
                },
                Instant::now(),
            )
            .expect("search input should dispatch");
        assert!(effects.is_empty());
        assert!(!runtime.search().is_busy());
        assert!(runtime.next_deadline().is_none());
        assert!(runtime.tick(Instant::now()).is_empty());
    }

    #[test]
    fn plain_links_navigate_and_post_links_submit_directly() {
        let mut runtime = runtime();
        assert_eq!(
            runtime
                .simulate_link_click("view_report_7")
                .expect("click should dispatch"),
            vec![Effect::Navigate("/reports/view/7/".to_string())]
        );

        let submission = only_submission(
            runtime
                .simulate_link_click("favorite_report_7")
                .expect("click should dispatch"),
        );
        assert_eq!(submission.method, HttpMethod::Post);
        assert!(runtime.pending_confirmation().is_none());
    }

    #[test]
    fn replayed_interactions_produce_identical_logs() {
        let replay = || {
            let mut runtime = runtime();
            runtime
                .simulate_remove_click("report_fields", "201")
                .expect("remove should apply");
            runtime
                .simulate_add_click("report_fields", "301")
                .expect("add should apply");
            runtime
                .simulate_link_click("delete_report_7")
                .expect("click should dispatch");
            runtime
        };
        let first = replay();
        let second = replay();
        assert_eq!(first.event_log(), second.event_log());
        assert_eq!(first.event_log().len(), 3);
    }

    #[test]
    fn malformed_page_sets_runtime_error() {
        let mut runtime = PageRuntime::new(settings());
        let result = runtime.load_page_json(r#"{"schema_version": "one", "elements": []}"#);
        assert!(matches!(result, Err(RuntimeError::Deserialize(_))));
        assert!(runtime.runtime_error().is_some());
        assert!(runtime.page().is_none());
        assert_eq!(
            runtime.dispatch(
                UiEvent::FormSubmitted {
                    form_id: "create_report".to_string()
                },
                Instant::now()
            ),
            Err(RuntimeError::NoPage)
        );
    }

    #[test]
    fn unknown_initial_selection_fails_strict_load() {
        let page = DEMO_PAGE.replace(r#""selected": ["102", "201"]"#, r#""selected": ["102", "999"]"#);

        let mut strict = PageRuntime::new(settings());
        assert!(matches!(
            strict.load_page_json(&page),
            Err(RuntimeError::Consistency(_))
        ));

        let mut lenient = PageRuntime::new(PageSettings {
            consistency: ConsistencyPolicy::Lenient,
            ..settings()
        });
        lenient.load_page_json(&page).expect("lenient load drops unknown ids");
        assert_eq!(selection(&lenient, "report_fields"), vec!["102"]);
    }
}
