use crate::theme::Theme;
use crate::ui::action_link::ActionLink;
use crate::ui::catalog::FieldId;
use crate::ui::datepicker::{DateInputState, EndDate};
use crate::ui::delegate::{
    ElementRef, ADD_FIELD_CLASS, DOCUMENT_ROOT, FIELD_ID_ATTR, LINK_ID_ATTR, METHOD_ATTR,
    REMOVE_FIELD_CLASS,
};
use crate::ui::event::UiEvent;
use crate::ui::runtime::input_key;
use crate::ui::schema::{
    ElementKind, FormElement, InputElement, SchemaRegistry, SearchPanel, ValidatedPage,
    CONFIRM_ATTR,
};
use crate::ui::search::{SearchController, SearchFilter, SearchQuery};
use crate::ui::selector::{ItemBounds, SelectorInstance};
use eframe::egui::{self, RichText, ScrollArea};
use std::collections::{BTreeMap, BTreeSet};

/// Read-only slice of page state handed to the renderer for one frame.
pub struct PageView<'a> {
    pub page: &'a ValidatedPage,
    pub selectors: &'a [SelectorInstance],
    pub search: &'a SearchController,
    pub search_query: &'a SearchQuery,
    pub date_state: &'a BTreeMap<String, DateInputState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DragPayload {
    selector_id: String,
    field_id: FieldId,
}

pub struct ComponentRegistry {
    allowed_elements: BTreeSet<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            allowed_elements: BTreeSet::from(["form", "input", "selector", "link", "search"]),
        }
    }

    pub fn render_page(
        &self,
        view: &PageView<'_>,
        input_state: &mut BTreeMap<String, String>,
        ui: &mut egui::Ui,
        theme: &Theme,
        emit: &mut dyn FnMut(UiEvent),
    ) {
        if let Some(title) = &view.page.title {
            ui.heading(title);
            ui.add_space(theme.gap);
        }

        if let Some(panel) = &view.page.search {
            self.render_search(panel, view, ui, theme, emit);
            ui.add_space(theme.gap_large);
        }

        for form in &view.page.forms {
            self.render_form(form, view, input_state, ui, theme, emit);
            ui.add_space(theme.gap_large);
        }

        if !view.page.links.is_empty() {
            theme.card_frame().show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for link in &view.page.links {
                        self.render_link(link, ui, theme, emit);
                    }
                });
            });
        }
    }

    fn render_search(
        &self,
        panel: &SearchPanel,
        view: &PageView<'_>,
        ui: &mut egui::Ui,
        theme: &Theme,
        emit: &mut dyn FnMut(UiEvent),
    ) {
        theme.card_frame().show(ui, |ui| {
            if let Some(label) = &panel.label {
                ui.label(RichText::new(label).color(theme.text).size(13.0));
                ui.add_space(theme.gap);
            }

            let mut text = view.search_query.text.clone();
            let mut filter = view.search_query.filter;
            let mut changed = false;
            ui.horizontal(|ui| {
                egui::ComboBox::from_id_salt(format!("{}::filter", panel.id))
                    .selected_text(filter.label())
                    .show_ui(ui, |ui| {
                        for option in SearchFilter::ALL {
                            changed |= ui
                                .selectable_value(&mut filter, option, option.label())
                                .changed();
                        }
                    });
                let response = ui.add(
                    egui::TextEdit::singleline(&mut text)
                        .desired_width(f32::INFINITY)
                        .hint_text("Search"),
                );
                changed |= response.changed();
            });

            if view.search.is_busy() {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new().color(theme.busy));
                    ui.label(RichText::new("Searching...").color(theme.text_muted).size(12.0));
                });
            }

            if let Some(results) = view.search.results() {
                ui.add_space(theme.gap);
                ScrollArea::vertical()
                    .id_salt(format!("{}::results", panel.id))
                    .max_height(180.0)
                    .show(ui, |ui| {
                        ui.label(
                            RichText::new(results)
                                .color(theme.text)
                                .size(13.0)
                                .monospace(),
                        );
                    });
            }

            if changed {
                emit(UiEvent::SearchInput { text, filter });
            }
        });
    }

    fn render_form(
        &self,
        form: &FormElement,
        view: &PageView<'_>,
        input_state: &mut BTreeMap<String, String>,
        ui: &mut egui::Ui,
        theme: &Theme,
        emit: &mut dyn FnMut(UiEvent),
    ) {
        theme.card_frame().show(ui, |ui| {
            if let Some(title) = &form.title {
                ui.label(RichText::new(title).color(theme.text).size(13.0));
                ui.add_space(theme.gap);
            }

            ui.vertical(|ui| {
                ui.spacing_mut().item_spacing.y = theme.gap;
                for input in &form.inputs {
                    self.render_input(form, input, view, input_state, ui, theme, emit);
                }
                for element in &form.selectors {
                    let Some(selector) = view
                        .selectors
                        .iter()
                        .find(|selector| selector.id() == element.id)
                    else {
                        continue;
                    };
                    ui.add_space(theme.gap_small);
                    if let Some(label) = &element.label {
                        ui.label(RichText::new(label).color(theme.text).size(13.0));
                    }
                    self.render_selector(selector, ui, theme, emit);
                }
            });

            ui.add_space(theme.gap_large);
            let submit = theme.submit_button(format!("Submit ({})", form.method));
            if ui.add(submit).clicked() {
                emit(UiEvent::FormSubmitted {
                    form_id: form.id.clone(),
                });
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn render_input(
        &self,
        form: &FormElement,
        input: &InputElement,
        view: &PageView<'_>,
        input_state: &mut BTreeMap<String, String>,
        ui: &mut egui::Ui,
        theme: &Theme,
        emit: &mut dyn FnMut(UiEvent),
    ) {
        let key = input_key(&form.id, &input.name);
        let buffer = input_state
            .entry(key.clone())
            .or_insert_with(|| input.value.clone());

        ui.label(RichText::new(&input.label).color(theme.text_muted).size(12.0));
        let hint = if input.is_date {
            view.page.datepicker.format.as_str()
        } else {
            ""
        };
        let response = ui.add(
            egui::TextEdit::singleline(buffer)
                .id_salt(("input", input.id.as_str()))
                .desired_width(f32::INFINITY)
                .hint_text(hint),
        );
        if response.lost_focus() {
            emit(UiEvent::InputCommitted {
                form_id: form.id.clone(),
                name: input.name.clone(),
                value: buffer.clone(),
            });
        }

        if !input.is_date {
            return;
        }
        let state = view.date_state.get(&key);
        if response.has_focus() || state.is_some_and(|state| state.open) {
            let options = &view.page.datepicker;
            let bound = match options.end_date {
                EndDate::Today => "no later than today",
                EndDate::Unbounded => "any date",
            };
            ui.label(
                RichText::new(format!("{}, {bound}", options.format))
                    .color(theme.text_muted)
                    .size(12.0),
            );
        }
        if let Some(error) = state.and_then(|state| state.error.as_ref()) {
            ui.label(RichText::new(error.to_string()).color(theme.error).size(12.0));
        }
    }

    fn render_selector(
        &self,
        selector: &SelectorInstance,
        ui: &mut egui::Ui,
        theme: &Theme,
        emit: &mut dyn FnMut(UiEvent),
    ) {
        let selector_id = selector.id().to_string();
        let field_ref = |field_id: &FieldId, class: &str| {
            ElementRef::new("button")
                .with_class(class)
                .with_data(FIELD_ID_ATTR, field_id.as_str())
        };

        ui.columns(2, |columns| {
            columns[0].label(RichText::new("Available").color(theme.text_muted).size(12.0));
            for group in selector.catalog().groups() {
                egui::CollapsingHeader::new(group.label)
                    .id_salt((selector_id.as_str(), group.label))
                    .default_open(true)
                    .show(&mut columns[0], |ui| {
                        for entry in group.entries {
                            let field_id = &entry.field.id;
                            ui.horizontal(|ui| {
                                let add =
                                    ui.add_enabled(!entry.is_selected(), egui::Button::new("+"));
                                if add.clicked() {
                                    emit(UiEvent::Click {
                                        root: selector_id.clone(),
                                        target: field_ref(field_id, ADD_FIELD_CLASS),
                                    });
                                }
                                let label = RichText::new(&entry.field.display_name)
                                    .color(theme.catalog_entry_color(entry.is_selected()))
                                    .size(13.0);
                                if entry.is_selected() {
                                    ui.label(label);
                                } else {
                                    ui.dnd_drag_source(
                                        egui::Id::new((
                                            selector_id.as_str(),
                                            "catalog",
                                            field_id.as_str(),
                                        )),
                                        DragPayload {
                                            selector_id: selector_id.clone(),
                                            field_id: field_id.clone(),
                                        },
                                        |ui| ui.label(label),
                                    );
                                }
                            });
                        }
                    });
            }

            columns[1].label(
                RichText::new(format!("Selected ({})", selector.selection().len()))
                    .color(theme.text_muted)
                    .size(12.0),
            );
            let mut items = Vec::new();
            let drag_active =
                egui::DragAndDrop::has_payload_of_type::<DragPayload>(columns[1].ctx());
            let frame = theme.drop_zone_frame(drag_active);
            let (_, dropped) = columns[1].dnd_drop_zone::<DragPayload, ()>(frame, |ui| {
                ui.set_min_width(ui.available_width());
                if selector.selection().is_empty() {
                    ui.label(
                        RichText::new("Drag fields here or use +")
                            .color(theme.text_muted)
                            .size(12.0),
                    );
                }
                for field_id in selector.selection().iter() {
                    let response = ui
                        .dnd_drag_source(
                            egui::Id::new((selector_id.as_str(), "selected", field_id.as_str())),
                            DragPayload {
                                selector_id: selector_id.clone(),
                                field_id: field_id.clone(),
                            },
                            |ui| {
                                ui.horizontal(|ui| {
                                    if ui.small_button("×").clicked() {
                                        emit(UiEvent::Click {
                                            root: selector_id.clone(),
                                            target: field_ref(field_id, REMOVE_FIELD_CLASS),
                                        });
                                    }
                                    ui.label(
                                        RichText::new(selector.catalog().display_name(field_id))
                                            .color(theme.text)
                                            .size(13.0),
                                    );
                                });
                            },
                        )
                        .response;
                    items.push(ItemBounds {
                        top: response.rect.top(),
                        bottom: response.rect.bottom(),
                    });
                }
            });

            if let Some(payload) = dropped {
                if payload.selector_id == selector_id {
                    let pointer_y = columns[1]
                        .ctx()
                        .pointer_interact_pos()
                        .map_or(f32::INFINITY, |pos| pos.y);
                    emit(UiEvent::DragReleased {
                        selector_id: selector_id.clone(),
                        field_id: payload.field_id.clone(),
                        pointer_y,
                        items,
                    });
                }
            }
        });
    }

    fn render_link(
        &self,
        link: &ActionLink,
        ui: &mut egui::Ui,
        theme: &Theme,
        emit: &mut dyn FnMut(UiEvent),
    ) {
        let response = ui.link(
            RichText::new(&link.label)
                .color(theme.link_color(link))
                .size(13.0),
        );
        let response = response.on_hover_text(&link.href);
        if response.clicked() {
            let mut target = ElementRef::new("a").with_data(LINK_ID_ATTR, link.id.as_str());
            if let Some(method) = &link.method {
                target = target.with_data(METHOD_ATTR, method.as_str());
            }
            if let Some(confirm) = &link.confirm {
                target = target.with_data(CONFIRM_ATTR, confirm.as_str());
            }
            emit(UiEvent::Click {
                root: DOCUMENT_ROOT.to_string(),
                target,
            });
        }
    }
}

impl SchemaRegistry for ComponentRegistry {
    fn supports_element(&self, kind: &ElementKind) -> bool {
        self.allowed_elements.contains(kind.as_str())
    }
}
