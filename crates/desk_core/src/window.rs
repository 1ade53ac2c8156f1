//! Singleton-per-role window registry.

use std::{collections::HashMap, sync::Arc};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use shared::{
    domain::{WindowId, WindowRole},
    protocol::WindowEvent,
};
use tracing::{debug, info};

use crate::error::{DeliveryError, WindowError};

pub const WINDOW_EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub modal: bool,
    pub auto_hide_menu_bar: bool,
    pub view: String,
    /// Filled in by [`WindowManager::ensure`]; child windows hang off main.
    pub parent: Option<WindowId>,
}

impl WindowSpec {
    fn dialog(title: &str, view: &str) -> Self {
        Self {
            title: title.to_string(),
            width: 640,
            height: 480,
            resizable: false,
            modal: true,
            auto_hide_menu_bar: true,
            view: view.to_string(),
            parent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpecs {
    pub main: WindowSpec,
    pub register: WindowSpec,
    pub list: WindowSpec,
}

impl WindowSpecs {
    pub fn for_role(&self, role: WindowRole) -> &WindowSpec {
        match role {
            WindowRole::Main => &self.main,
            WindowRole::Register => &self.register,
            WindowRole::List => &self.list,
        }
    }
}

impl Default for WindowSpecs {
    fn default() -> Self {
        Self {
            main: WindowSpec {
                title: "Citizen Desk".to_string(),
                width: 800,
                height: 600,
                resizable: true,
                modal: false,
                auto_hide_menu_bar: false,
                view: "views/index.html".to_string(),
                parent: None,
            },
            register: WindowSpec::dialog("Register citizen", "views/register/register.html"),
            list: WindowSpec::dialog("Citizens", "views/list/list.html"),
        }
    }
}

/// One navigation of a window's content. The first load after `open` is
/// generation 0 and every reload bumps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLoad {
    pub window_id: WindowId,
    pub generation: u64,
}

/// Platform side of the window boundary.
///
/// Hosts echo the [`PageLoad`] they were given back through
/// [`crate::CoreHandle::window_loaded`] once that navigation finishes, and
/// report every close through [`crate::CoreHandle::window_closed`], including
/// closes the core itself asked for.
pub trait WindowHost: Send + Sync {
    fn open(
        &self,
        load: PageLoad,
        role: WindowRole,
        spec: &WindowSpec,
        events: Receiver<WindowEvent>,
    ) -> Result<(), WindowError>;
    fn show(&self, window_id: WindowId);
    fn reload(&self, load: PageLoad);
    fn close(&self, window_id: WindowId);
}

/// Owning handle for one live window. Only [`WindowManager`] holds these.
#[derive(Debug)]
pub struct WindowHandle {
    id: WindowId,
    role: WindowRole,
    events: Sender<WindowEvent>,
    generation: u64,
    loaded: bool,
}

impl WindowHandle {
    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn role(&self) -> WindowRole {
        self.role
    }

    pub fn current_load(&self) -> PageLoad {
        PageLoad {
            window_id: self.id,
            generation: self.generation,
        }
    }

    /// Whether the current navigation has reported load-complete.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn send(&self, event: WindowEvent) -> Result<(), DeliveryError> {
        let channel = event.channel();
        match self.events.try_send(event) {
            Ok(()) => {
                debug!(
                    window_id = self.id.0,
                    role = %self.role,
                    channel,
                    "queued core->window event"
                );
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DeliveryError::QueueFull {
                window_id: self.id,
                channel,
            }),
            Err(TrySendError::Disconnected(_)) => Err(DeliveryError::WindowMissing {
                window_id: self.id,
                channel,
            }),
        }
    }
}

pub struct WindowManager {
    host: Arc<dyn WindowHost>,
    windows: HashMap<WindowRole, WindowHandle>,
    closing: HashMap<WindowId, WindowRole>,
    next_id: i64,
}

impl WindowManager {
    pub fn new(host: Arc<dyn WindowHost>) -> Self {
        Self {
            host,
            windows: HashMap::new(),
            closing: HashMap::new(),
            next_id: 1,
        }
    }

    /// Returns the live window for `role`, opening one from `spec` if none exists.
    pub fn ensure(
        &mut self,
        role: WindowRole,
        spec: &WindowSpec,
    ) -> Result<&WindowHandle, WindowError> {
        if self.windows.contains_key(&role) {
            return Ok(&self.windows[&role]);
        }

        let mut spec = spec.clone();
        if role != WindowRole::Main {
            spec.parent = self.windows.get(&WindowRole::Main).map(WindowHandle::id);
        }

        let window_id = WindowId(self.next_id);
        self.next_id += 1;

        let (events_tx, events_rx) = bounded(WINDOW_EVENT_QUEUE_CAPACITY);
        let load = PageLoad {
            window_id,
            generation: 0,
        };
        self.host.open(load, role, &spec, events_rx)?;
        info!(
            window_id = window_id.0,
            role = %role,
            parent = spec.parent.map(|parent| parent.0),
            "opened window"
        );

        let handle = WindowHandle {
            id: window_id,
            role,
            events: events_tx,
            generation: load.generation,
            loaded: false,
        };
        Ok(&*self.windows.entry(role).or_insert(handle))
    }

    pub fn get(&self, role: WindowRole) -> Option<&WindowHandle> {
        self.windows.get(&role)
    }

    pub fn find(&self, window_id: WindowId) -> Option<&WindowHandle> {
        self.windows.values().find(|handle| handle.id == window_id)
    }

    pub fn is_open(&self, role: WindowRole) -> bool {
        self.windows.contains_key(&role)
    }

    pub fn show(&self, role: WindowRole) {
        if let Some(handle) = self.windows.get(&role) {
            self.host.show(handle.id);
        }
    }

    /// Starts a new navigation of the window for `role` and returns it.
    pub fn reload(&mut self, role: WindowRole) -> Option<PageLoad> {
        let handle = self.windows.get_mut(&role)?;
        handle.generation += 1;
        handle.loaded = false;
        let load = handle.current_load();
        debug!(
            window_id = load.window_id.0,
            role = %role,
            generation = load.generation,
            "reloading window"
        );
        self.host.reload(load);
        Some(load)
    }

    /// Load observer. Returns `true` when `load` is the live window's current
    /// navigation; signals from closed windows or superseded navigations are
    /// ignored.
    pub fn on_loaded(&mut self, load: PageLoad) -> bool {
        let Some(handle) = self
            .windows
            .values_mut()
            .find(|handle| handle.id == load.window_id)
        else {
            debug!(window_id = load.window_id.0, "ignoring load for unknown window");
            return false;
        };
        if handle.generation != load.generation {
            debug!(
                window_id = load.window_id.0,
                generation = load.generation,
                current = handle.generation,
                "ignoring load from superseded navigation"
            );
            return false;
        }
        handle.loaded = true;
        true
    }

    /// Asks the host to close the window for `role` and forgets it right away.
    /// Closing a role with no live window is a no-op.
    pub fn close(&mut self, role: WindowRole) -> Option<WindowId> {
        let Some(handle) = self.windows.remove(&role) else {
            debug!(role = %role, "close requested for window that is not open");
            return None;
        };
        info!(window_id = handle.id.0, role = %role, "closing window");
        self.closing.insert(handle.id, role);
        self.host.close(handle.id);
        Some(handle.id)
    }

    /// Close observer. Returns the role the window had if this is the first
    /// close notification for it, `None` for unknown or repeated ids.
    pub fn on_closed(&mut self, window_id: WindowId) -> Option<WindowRole> {
        if let Some(role) = self.closing.remove(&window_id) {
            return Some(role);
        }

        let role = self
            .windows
            .iter()
            .find(|(_, handle)| handle.id == window_id)
            .map(|(role, _)| *role);
        match role {
            Some(role) => {
                self.windows.remove(&role);
                info!(window_id = window_id.0, role = %role, "window closed");
                Some(role)
            }
            None => {
                debug!(window_id = window_id.0, "ignoring close for unknown window");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/window_tests.rs"]
mod tests;
