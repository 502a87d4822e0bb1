use crate::event::AppEvent;
use crate::net::ConsoleClient;
use crate::theme::Theme;
use crate::ui::event::UiEvent;
use crate::ui::runtime::{Effect, PageRuntime};
use crate::ui::search::Resolution;
use eframe::egui::{self, RichText, ScrollArea};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub struct ConsoleApp {
    rx: Receiver<AppEvent>,
    client: ConsoleClient,
    runtime: PageRuntime,
    theme: Theme,
    page_source: String,
    diagnostics_log: Vec<String>,
    last_response: Option<String>,
}

impl ConsoleApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        client: ConsoleClient,
        runtime: PageRuntime,
        page_source: String,
    ) -> Self {
        let mut app = Self {
            rx,
            client,
            runtime,
            theme: Theme::default(),
            page_source,
            diagnostics_log: Vec::new(),
            last_response: None,
        };

        if let Some(error) = app.runtime.runtime_error().cloned() {
            app.log_diagnostic(format!("page error: {error}"));
        }
        let warnings: Vec<String> = app
            .runtime
            .catalog_diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.to_log_line())
            .collect();
        for warning in warnings {
            app.log_diagnostic(warning);
        }

        app
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: &egui::Context) {
        match event {
            AppEvent::SearchResolved { seq, outcome } => {
                match self.runtime.apply_search_outcome(seq, outcome) {
                    Resolution::Applied => {}
                    Resolution::Stale { seq, latest } => {
                        self.log_diagnostic(format!(
                            "discarded stale search response {seq} (latest {latest})"
                        ));
                    }
                    Resolution::Failed(failure) => {
                        self.log_diagnostic(format!("search failed: {failure}"));
                    }
                }
                ctx.request_repaint();
            }
            AppEvent::SubmissionCompleted {
                method,
                url,
                status,
            } => {
                let line = format!("{method} {url} -> {status}");
                tracing::info!("{line}");
                self.log_diagnostic(line.clone());
                self.last_response = Some(line);
                ctx.request_repaint();
            }
            AppEvent::RequestFailed { url, message } => {
                tracing::warn!(url = %url, "{message}");
                self.log_diagnostic(format!("request to {url} failed: {message}"));
                ctx.request_repaint();
            }
        }
    }

    fn dispatch(&mut self, events: Vec<UiEvent>) {
        for event in events {
            match self.runtime.dispatch(event, Instant::now()) {
                Ok(effects) => self.perform(effects),
                Err(err) => self.log_diagnostic(format!("event rejected: {err}")),
            }
        }
    }

    fn perform(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            if let Effect::Navigate(href) = &effect {
                self.log_diagnostic(format!("navigate {href}"));
            }
            self.client.perform(effect);
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let busy = self.runtime.search().is_busy();
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Report Desk");
                ui.separator();
                ui.label(
                    RichText::new(self.client.base_url().as_str()).color(self.theme.text_muted),
                );
                ui.separator();
                ui.label(RichText::new(&self.page_source).color(self.theme.text_muted));
                if busy {
                    ui.separator();
                    ui.add(egui::Spinner::new().color(self.theme.busy));
                }
            });
        });
    }

    fn render_bottom_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("diagnostics_panel")
            .resizable(true)
            .show(ctx, |ui| {
                if let Some(last) = &self.last_response {
                    ui.label(RichText::new(last).color(self.theme.response_ok));
                }
                egui::CollapsingHeader::new("Diagnostics")
                    .default_open(false)
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_salt("diagnostics_log")
                            .max_height(120.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for entry in &self.diagnostics_log {
                                    ui.label(entry);
                                }
                            });
                    });
                egui::CollapsingHeader::new("Event log")
                    .default_open(false)
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_salt("event_log")
                            .max_height(120.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for event in self.runtime.event_log() {
                                    ui.label(RichText::new(event.to_log_line()).monospace());
                                }
                            });
                    });
            });
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) -> Vec<UiEvent> {
        let mut events = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .id_salt("page")
                .show(ui, |ui| {
                    events = self.runtime.render_page(ui, &self.theme);
                });
        });
        events
    }

    fn render_confirmation(&mut self, ctx: &egui::Context) -> Vec<UiEvent> {
        let Some(pending) = self.runtime.pending_confirmation() else {
            return Vec::new();
        };
        let link_id = pending.link().id.clone();
        let message = pending.message().to_string();
        let mut answer = None;

        let modal = egui::Modal::new(egui::Id::new(("confirm", link_id.as_str())))
            .frame(self.theme.card_frame())
            .show(ctx, |ui| {
                ui.set_max_width(360.0);
                ui.label(RichText::new(&message).color(self.theme.text));
                ui.add_space(self.theme.gap);
                ui.horizontal(|ui| {
                    if ui.add(self.theme.secondary_button("Cancel")).clicked() {
                        answer = Some(false);
                    }
                    if ui.add(self.theme.destructive_button("OK")).clicked() {
                        answer = Some(true);
                    }
                });
            });
        if answer.is_none() && modal.should_close() {
            answer = Some(false);
        }

        answer
            .map(|accepted| UiEvent::ConfirmationAnswered { link_id, accepted })
            .into_iter()
            .collect()
    }
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);

        let effects = self.runtime.tick(Instant::now());
        self.perform(effects);

        self.render_top_bar(ctx);
        self.render_bottom_panel(ctx);
        let mut events = self.render_center_panel(ctx);
        events.extend(self.render_confirmation(ctx));
        self.dispatch(events);

        if let Some(deadline) = self.runtime.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
    }
}
