//! Single event loop that owns the window registry and the event bridge.

use std::sync::Arc;

use shared::{
    domain::{WindowId, WindowRole},
    protocol::{WindowEvent, WindowRequest},
    store::CitizenStore,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    bridge::{Completion, EventBridge},
    error::{CoreClosed, WindowError},
    menu::{MenuCommand, MenuController},
    serial::SerialLine,
    window::{PageLoad, WindowHost, WindowManager, WindowSpecs},
};

#[derive(Debug)]
pub enum CoreEvent {
    Menu(MenuCommand),
    Request {
        origin: WindowId,
        request: WindowRequest,
    },
    WindowLoaded(PageLoad),
    WindowClosed(WindowId),
    Serial(SerialLine),
    Completed(Completion),
    Shutdown,
}

impl CoreEvent {
    fn name(&self) -> &'static str {
        match self {
            CoreEvent::Menu(_) => "menu",
            CoreEvent::Request { .. } => "request",
            CoreEvent::WindowLoaded(_) => "window_loaded",
            CoreEvent::WindowClosed(_) => "window_closed",
            CoreEvent::Serial(_) => "serial",
            CoreEvent::Completed(_) => "completed",
            CoreEvent::Shutdown => "shutdown",
        }
    }
}

/// Cloneable sender into the core intake; usable from any thread.
#[derive(Debug, Clone)]
pub struct CoreHandle {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl CoreHandle {
    pub fn post(&self, event: CoreEvent) -> Result<(), CoreClosed> {
        self.tx.send(event).map_err(|_| CoreClosed)
    }

    pub fn menu(&self, command: MenuCommand) -> Result<(), CoreClosed> {
        self.post(CoreEvent::Menu(command))
    }

    pub fn request(&self, origin: WindowId, request: WindowRequest) -> Result<(), CoreClosed> {
        self.post(CoreEvent::Request { origin, request })
    }

    pub fn window_loaded(&self, load: PageLoad) -> Result<(), CoreClosed> {
        self.post(CoreEvent::WindowLoaded(load))
    }

    pub fn window_closed(&self, window_id: WindowId) -> Result<(), CoreClosed> {
        self.post(CoreEvent::WindowClosed(window_id))
    }

    pub fn serial_line(&self, line: SerialLine) -> Result<(), CoreClosed> {
        self.post(CoreEvent::Serial(line))
    }

    pub fn shutdown(&self) -> Result<(), CoreClosed> {
        self.post(CoreEvent::Shutdown)
    }
}

pub struct CoreIntake {
    rx: mpsc::UnboundedReceiver<CoreEvent>,
}

pub fn channel() -> (CoreHandle, CoreIntake) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CoreHandle { tx }, CoreIntake { rx })
}

pub struct Core {
    intake: CoreIntake,
    windows: WindowManager,
    bridge: EventBridge,
    menu: MenuController,
    running: bool,
}

impl Core {
    pub fn new(
        handle: CoreHandle,
        intake: CoreIntake,
        host: Arc<dyn WindowHost>,
        store: Arc<dyn CitizenStore>,
        specs: WindowSpecs,
    ) -> Self {
        Self {
            intake,
            windows: WindowManager::new(host),
            bridge: EventBridge::new(store, handle),
            menu: MenuController::new(specs),
            running: true,
        }
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.bridge
    }

    /// Opens the main window.
    pub fn start(&mut self) -> Result<WindowId, WindowError> {
        let spec = self.menu.specs().for_role(WindowRole::Main);
        let main = self.windows.ensure(WindowRole::Main, spec)?.id();
        self.windows.show(WindowRole::Main);
        Ok(main)
    }

    pub async fn run(mut self) -> Result<(), WindowError> {
        let main = self.start()?;
        info!(window_id = main.0, "core event loop started");
        while self.step().await {}
        info!("core event loop stopped");
        Ok(())
    }

    /// Waits for the next event and handles it to completion. Returns `false`
    /// once the loop should stop.
    pub async fn step(&mut self) -> bool {
        let Some(event) = self.intake.rx.recv().await else {
            return false;
        };
        self.handle(event);
        self.running
    }

    pub fn handle(&mut self, event: CoreEvent) {
        debug!(event = event.name(), "handling core event");
        match event {
            CoreEvent::Menu(command) => {
                if let Err(err) = self
                    .menu
                    .dispatch(command, &mut self.windows, &mut self.bridge)
                {
                    error!(command = command.as_str(), "menu command failed: {err}");
                }
            }
            CoreEvent::Request { origin, request } => {
                self.bridge
                    .handle_request(&mut self.windows, origin, request);
            }
            CoreEvent::WindowLoaded(load) => {
                if self.windows.on_loaded(load) {
                    self.bridge.on_window_loaded(&self.windows, load);
                }
            }
            CoreEvent::WindowClosed(window_id) => self.on_window_closed(window_id),
            CoreEvent::Serial(line) => self.fan_out(line),
            CoreEvent::Completed(completion) => {
                self.bridge.on_completion(&mut self.windows, completion);
            }
            CoreEvent::Shutdown => {
                info!("shutdown requested");
                self.close_all();
                self.running = false;
            }
        }
    }

    fn on_window_closed(&mut self, window_id: WindowId) {
        let role = self.windows.on_closed(window_id);
        self.bridge.on_window_closed(window_id);
        if role == Some(WindowRole::Main) {
            info!("main window closed; shutting down");
            self.close_all();
            self.running = false;
        }
    }

    fn close_all(&mut self) {
        for role in [WindowRole::Register, WindowRole::List, WindowRole::Main] {
            self.windows.close(role);
        }
    }

    fn fan_out(&self, line: SerialLine) {
        let Some(main) = self.windows.get(WindowRole::Main) else {
            debug!(line = line.as_str(), "no main window; dropping serial line");
            return;
        };
        let event = WindowEvent::SerialData {
            line: line.into_string(),
        };
        if let Err(err) = main.send(event) {
            warn!("{err}");
        }
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
