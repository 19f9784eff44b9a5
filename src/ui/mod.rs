use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align, Color32, Layout, RichText};
use log::{error, warn};
use tokio::runtime::{Builder, Runtime};

use crate::backend::{EventHub, NotificationChannel};
use crate::backend::helper::HelperBackend;
use crate::config::LauncherConfig;
use crate::login::LoginTrigger;
use crate::session::SessionStore;
use crate::session::models::{Account, Character};
use crate::session::state::UserAction;
use crate::sync::{SessionSync, SyncState};
use crate::util::non_blank;

/// How often to poll for backend events while nothing else asks for a repaint.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThemePalette {
    text_primary: Color32,
    text_muted: Color32,
    accent: Color32,
    warning: Color32,
    danger: Color32,
}

impl ThemePalette {
    const fn dark() -> Self {
        Self {
            text_primary: Color32::from_rgb(228, 235, 244),
            text_muted: Color32::from_rgb(167, 182, 197),
            accent: Color32::from_rgb(92, 219, 195),
            warning: Color32::from_rgb(246, 195, 111),
            danger: Color32::from_rgb(239, 117, 117),
        }
    }
}

fn build_runtime() -> Arc<Runtime> {
    match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            warn!(
                "ui: failed to create multithreaded runtime ({}); trying single-threaded runtime",
                err
            );
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => Arc::new(rt),
                Err(fallback_err) => {
                    error!(
                        "ui: failed to create any Tokio runtime ({}); terminating launcher",
                        fallback_err
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct AddAccountForm {
    account_name: String,
    email: String,
}

impl AddAccountForm {
    fn is_valid(&self) -> bool {
        non_blank(&self.account_name).is_some() && non_blank(&self.email).is_some()
    }
}

/// Collect the login outcome before draining notifications. The bridge emits
/// `login-complete` before its command resolves, so once `busy` is observed
/// clear the completion is already buffered and gets applied in the same pass.
fn drain_backend<C: NotificationChannel>(
    sync: &mut SessionSync<C>,
    login: &mut LoginTrigger,
    store: &mut SessionStore,
) -> usize {
    login.poll();
    sync.pump(store)
}

pub struct LauncherApp {
    runtime: Arc<Runtime>,
    store: SessionStore,
    sync: SessionSync<EventHub>,
    login: LoginTrigger,
    backend: HelperBackend,
    add_form: Option<AddAccountForm>,
    colors: ThemePalette,
}

impl LauncherApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: LauncherConfig) -> Self {
        let runtime = build_runtime();
        let hub = EventHub::new();
        let backend = HelperBackend::new(
            config.auth_helper.clone(),
            config.auth_helper_args.clone(),
            hub.clone(),
        );
        let mut sync = SessionSync::new(hub);
        sync.activate(runtime.handle());

        Self {
            runtime,
            store: SessionStore::new(config.duplicate_policy),
            sync,
            login: LoginTrigger::new(),
            backend,
            add_form: None,
            colors: ThemePalette::dark(),
        }
    }

    fn sync_state(&mut self) {
        drain_backend(&mut self.sync, &mut self.login, &mut self.store);
        self.store.expire_play(Instant::now());
    }

    fn trigger_login(&mut self) {
        let rt = self.runtime.clone();
        self.login
            .trigger(&mut self.store, &self.backend, rt.handle());
    }

    fn render_account(&self, ui: &mut egui::Ui, account: &Account, actions: &mut Vec<UserAction>) {
        let colors = self.colors;
        let expanded = self.store.is_expanded(&account.id);
        ui.group(|ui| {
            ui.horizontal(|ui| {
                let header = format!(
                    "{}  {}",
                    if expanded { "▾" } else { "▸" },
                    account.initials()
                );
                if ui
                    .selectable_label(expanded, RichText::new(header).color(colors.accent))
                    .clicked()
                {
                    actions.push(UserAction::ToggleExpand {
                        account_id: account.id.clone(),
                    });
                }
                ui.vertical(|ui| {
                    ui.label(RichText::new(&account.account_name).color(colors.text_primary));
                    ui.label(RichText::new(&account.email).color(colors.text_muted).small());
                });
                if expanded {
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui
                            .button(RichText::new("Remove").color(colors.danger))
                            .clicked()
                        {
                            actions.push(UserAction::RemoveAccount {
                                account_id: account.id.clone(),
                            });
                        }
                    });
                }
            });

            if !expanded {
                return;
            }
            ui.separator();
            for character in &account.characters {
                self.render_character(ui, &account.id, character, actions);
            }
            if ui.button("Create character").clicked() {
                actions.push(UserAction::CreateCharacter {
                    account_id: account.id.clone(),
                });
            }
        });
    }

    fn render_character(
        &self,
        ui: &mut egui::Ui,
        account_id: &str,
        character: &Character,
        actions: &mut Vec<UserAction>,
    ) {
        let colors = self.colors;
        let playing = self.store.is_playing(account_id, &character.id);
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.label(RichText::new(character.display_name()).color(colors.text_primary));
                ui.label(
                    RichText::new(format!(
                        "Level {} · {} · Last played {} · {}",
                        character.level,
                        character.class_label.label(),
                        character.last_played,
                        character.total_playtime
                    ))
                    .color(colors.text_muted)
                    .small(),
                );
            });
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if playing {
                    if ui.button("Cancel").clicked() {
                        actions.push(UserAction::CancelPlay);
                    }
                    ui.label(RichText::new("Launching...").color(colors.warning));
                } else if ui.button("Play").clicked() {
                    actions.push(UserAction::Play {
                        account_id: account_id.to_owned(),
                        character_id: character.id.clone(),
                    });
                }
            });
        });
    }

    fn render_add_account(&mut self, ctx: &egui::Context, actions: &mut Vec<UserAction>) {
        let Some(form) = self.add_form.as_mut() else {
            return;
        };
        let mut close = false;
        egui::Window::new("Add account")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Account name");
                ui.text_edit_singleline(&mut form.account_name);
                ui.label("Email");
                ui.text_edit_singleline(&mut form.email);
                ui.horizontal(|ui| {
                    if ui.add_enabled(form.is_valid(), egui::Button::new("Add")).clicked() {
                        actions.push(UserAction::AddAccount {
                            account_name: form.account_name.clone(),
                            email: form.email.clone(),
                        });
                        close = true;
                    }
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                });
            });
        if close {
            self.add_form = None;
        }
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_state();
        let colors = self.colors;
        let mut actions = Vec::new();
        let mut login_clicked = false;
        let mut open_form = false;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.heading(RichText::new("Rune Launcher").color(colors.accent));
            ui.label(RichText::new("Accounts").color(colors.text_muted));
        });

        egui::TopBottomPanel::bottom("login_bar").show(ctx, |ui| {
            ui.add_space(6.0);
            let label = self.store.login_status_text().to_owned();
            let button = egui::Button::new(RichText::new(label).color(colors.text_primary))
                .min_size(egui::vec2(ui.available_width(), 34.0));
            ui.horizontal(|ui| {
                if self.login.is_busy() {
                    ui.spinner();
                }
                if ui.add_enabled(!self.login.is_busy(), button).clicked() {
                    login_clicked = true;
                }
            });
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for account in self.store.accounts() {
                    self.render_account(ui, account, &mut actions);
                    ui.add_space(8.0);
                }
                if ui.button("Add account manually").clicked() {
                    open_form = true;
                }
            });
        });

        if open_form && self.add_form.is_none() {
            self.add_form = Some(AddAccountForm::default());
        }
        self.render_add_account(ctx, &mut actions);

        for action in actions {
            self.store.handle_action(action);
        }
        if login_clicked {
            self.trigger_login();
        }

        if let Some(deadline) = self.store.play_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
        if self.sync.state() != SyncState::Released {
            ctx.request_repaint_after(EVENT_POLL_INTERVAL);
        }
    }
}

impl Drop for LauncherApp {
    fn drop(&mut self) {
        self.sync.deactivate();
        self.login.detach();
    }
}
