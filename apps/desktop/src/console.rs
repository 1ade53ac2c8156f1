//! Terminal stand-in for the window layer: each window is a renderer thread
//! that prints its events, and stdin plays the part of menus and forms.

use std::{
    collections::HashMap,
    io::{self, BufRead},
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use crossbeam_channel::Receiver;
use desk_core::{CoreHandle, MenuCommand, PageLoad, WindowError, WindowHost, WindowSpec};
use shared::{
    domain::{CitizenRecord, WindowId, WindowRole},
    protocol::{WindowEvent, WindowRequest},
};
use tracing::{debug, warn};

pub struct ConsoleHost {
    core: CoreHandle,
    windows: Mutex<HashMap<WindowId, WindowRole>>,
}

impl ConsoleHost {
    pub fn new(core: CoreHandle) -> Self {
        Self {
            core,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_for(&self, role: WindowRole) -> Option<WindowId> {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, open_role)| **open_role == role)
            .map(|(window_id, _)| *window_id)
    }

    /// Simulates the user closing a window from its title bar.
    pub fn user_close(&self, role: WindowRole) -> bool {
        match self.window_for(role) {
            Some(window_id) => {
                self.close(window_id);
                true
            }
            None => false,
        }
    }

    fn label(window_id: WindowId, role: WindowRole) -> String {
        format!("{role}#{}", window_id.0)
    }
}

impl WindowHost for ConsoleHost {
    fn open(
        &self,
        load: PageLoad,
        role: WindowRole,
        spec: &WindowSpec,
        events: Receiver<WindowEvent>,
    ) -> Result<(), WindowError> {
        let window_id = load.window_id;
        let label = Self::label(window_id, role);
        let renderer_label = label.clone();
        thread::Builder::new()
            .name(format!("window-{label}"))
            .spawn(move || render_events(&renderer_label, events))
            .map_err(|err| WindowError::HostRejected {
                role,
                message: err.to_string(),
            })?;

        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window_id, role);
        println!(
            "[{label}] opened \"{}\" {}x{} view={}{}",
            spec.title,
            spec.width,
            spec.height,
            spec.view,
            if spec.modal { " (modal)" } else { "" }
        );

        // Console views have nothing to load, so they finish immediately.
        if self.core.window_loaded(load).is_err() {
            debug!(window_id = window_id.0, "core stopped before window loaded");
        }
        Ok(())
    }

    fn show(&self, window_id: WindowId) {
        debug!(window_id = window_id.0, "show window");
    }

    fn reload(&self, load: PageLoad) {
        let window_id = load.window_id;
        println!("[#{}] reloaded", window_id.0);
        if self.core.window_loaded(load).is_err() {
            debug!(window_id = window_id.0, "core stopped before window reloaded");
        }
    }

    fn close(&self, window_id: WindowId) {
        let removed = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&window_id);
        if let Some(role) = removed {
            println!("[{}] closed", Self::label(window_id, role));
            if self.core.window_closed(window_id).is_err() {
                debug!(window_id = window_id.0, "core stopped before window closed");
            }
        }
    }
}

fn render_events(label: &str, events: Receiver<WindowEvent>) {
    while let Ok(event) = events.recv() {
        match serde_json::to_string(&event) {
            Ok(json) => println!("[{label}] {json}"),
            Err(err) => warn!(window = label, "failed to render {}: {err}", event.channel()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Menu(MenuCommand),
    Save(CitizenRecord),
    Cancel,
    Refresh,
    Close(WindowRole),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match verb.to_ascii_lowercase().as_str() {
        "register" => Ok(ConsoleCommand::Menu(MenuCommand::Register)),
        "list" => Ok(ConsoleCommand::Menu(MenuCommand::List)),
        "reload" => Ok(ConsoleCommand::Menu(MenuCommand::Reload)),
        "save" => {
            let value: serde_json::Value =
                serde_json::from_str(rest).map_err(|err| format!("invalid citizen JSON: {err}"))?;
            CitizenRecord::try_from(value)
                .map(ConsoleCommand::Save)
                .map_err(str::to_string)
        }
        "cancel" => Ok(ConsoleCommand::Cancel),
        "refresh" => Ok(ConsoleCommand::Refresh),
        "close" => WindowRole::parse(rest)
            .map(ConsoleCommand::Close)
            .ok_or_else(|| format!("unknown window '{rest}' (main, register, list)")),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command '{other}'; type 'help'")),
    }
}

const HELP: &str = "commands: register | list | reload | save <json> | cancel | refresh | close <main|register|list> | quit";

/// Reads console commands until stdin closes or the user quits, then asks the
/// core to shut down.
pub fn spawn_stdin_reader(
    host: Arc<ConsoleHost>,
    core: CoreHandle,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            println!("{HELP}");
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                if command == ConsoleCommand::Quit {
                    break;
                }
                if !run_command(&host, &core, command) {
                    return;
                }
            }
            if core.shutdown().is_err() {
                debug!("core already stopped when console input ended");
            }
        })
}

/// Returns `false` once the core is no longer accepting events.
fn run_command(host: &ConsoleHost, core: &CoreHandle, command: ConsoleCommand) -> bool {
    let posted = match command {
        ConsoleCommand::Menu(menu) => core.menu(menu),
        ConsoleCommand::Save(record) => {
            from_window(host, core, WindowRole::Register, WindowRequest::SaveCitizen { record })
        }
        ConsoleCommand::Cancel => from_window(
            host,
            core,
            WindowRole::Register,
            WindowRequest::CloseRegisterWindow,
        ),
        ConsoleCommand::Refresh => {
            from_window(host, core, WindowRole::List, WindowRequest::ListCitizens)
        }
        ConsoleCommand::Close(role) => {
            if !host.user_close(role) {
                println!("{role} window is not open");
            }
            Ok(())
        }
        ConsoleCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ConsoleCommand::Quit => core.shutdown(),
    };
    posted.is_ok()
}

fn from_window(
    host: &ConsoleHost,
    core: &CoreHandle,
    role: WindowRole,
    request: WindowRequest,
) -> Result<(), desk_core::CoreClosed> {
    match host.window_for(role) {
        Some(window_id) => core.request(window_id, request),
        None => {
            println!("{role} window is not open");
            Ok(())
        }
    }
}
