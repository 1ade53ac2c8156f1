//! Request/reply bridge between window content and the citizen store.
//!
//! Store calls run as spawned tasks and report back into the core intake as
//! [`Completion`]s, so every reply is sent from the event loop after a fresh
//! lookup of its target window. List results additionally wait behind a
//! per-request load gate until the list window has finished loading.

use std::{collections::HashMap, fmt, sync::Arc};

use shared::{
    domain::{CitizenRecord, StoredCitizen, WindowId, WindowRole},
    error::StoreError,
    protocol::{WindowEvent, WindowRequest},
    store::CitizenStore,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::DeliveryError,
    runtime::{CoreEvent, CoreHandle},
    window::{PageLoad, WindowHandle, WindowManager},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Who asked for the citizen list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrigin {
    Menu,
    Window(WindowId),
}

#[derive(Debug)]
pub enum Completion {
    Saved {
        request_id: RequestId,
        origin: WindowId,
        outcome: Result<StoredCitizen, StoreError>,
    },
    Listed {
        request_id: RequestId,
        window_id: WindowId,
        outcome: Result<Vec<StoredCitizen>, StoreError>,
    },
}

struct LoadGate {
    request_id: RequestId,
    /// Navigation whose load-complete releases the gate.
    generation: u64,
    loaded: bool,
    outcome: Option<Result<Vec<StoredCitizen>, StoreError>>,
}

pub struct EventBridge {
    store: Arc<dyn CitizenStore>,
    core: CoreHandle,
    list_gates: HashMap<WindowId, LoadGate>,
}

impl EventBridge {
    pub fn new(store: Arc<dyn CitizenStore>, core: CoreHandle) -> Self {
        Self {
            store,
            core,
            list_gates: HashMap::new(),
        }
    }

    pub fn pending_list_requests(&self) -> usize {
        self.list_gates.len()
    }

    pub fn handle_request(
        &mut self,
        windows: &mut WindowManager,
        origin: WindowId,
        request: WindowRequest,
    ) {
        debug!(
            origin = origin.0,
            channel = request.channel(),
            "received window request"
        );
        match request {
            WindowRequest::SaveCitizen { record } => {
                self.save_citizen(origin, record);
            }
            WindowRequest::CloseRegisterWindow => {
                windows.close(WindowRole::Register);
            }
            WindowRequest::ListCitizens => {
                self.request_list(windows, ListOrigin::Window(origin));
            }
        }
    }

    pub fn save_citizen(&mut self, origin: WindowId, record: CitizenRecord) -> RequestId {
        let request_id = RequestId::new();
        info!(%request_id, origin = origin.0, "persisting citizen");

        let store = Arc::clone(&self.store);
        let core = self.core.clone();
        tokio::spawn(async move {
            let outcome = store.save(record).await;
            let completion = Completion::Saved {
                request_id,
                origin,
                outcome,
            };
            if core.post(CoreEvent::Completed(completion)).is_err() {
                debug!(%request_id, "core stopped before save completed");
            }
        });
        request_id
    }

    /// Arms a one-shot load gate on the list window's current navigation and
    /// starts the fetch.
    ///
    /// Returns `None` without touching the store when no list window is open.
    /// The gate starts open when that navigation has already finished loading
    /// or the request came from the list window itself.
    pub fn request_list(
        &mut self,
        windows: &WindowManager,
        origin: ListOrigin,
    ) -> Option<RequestId> {
        let Some(handle) = windows.get(WindowRole::List) else {
            warn!(?origin, "list window not found; dropping list-citizens request");
            return None;
        };
        let load = handle.current_load();
        let window_id = load.window_id;

        let request_id = RequestId::new();
        let gate = LoadGate {
            request_id,
            generation: load.generation,
            loaded: handle.is_loaded() || origin == ListOrigin::Window(window_id),
            outcome: None,
        };
        if let Some(previous) = self.list_gates.insert(window_id, gate) {
            debug!(
                superseded = %previous.request_id,
                %request_id,
                window_id = window_id.0,
                "replacing pending list request"
            );
        }
        info!(%request_id, window_id = window_id.0, ?origin, "fetching citizens");

        let store = Arc::clone(&self.store);
        let core = self.core.clone();
        tokio::spawn(async move {
            let outcome = store.list_all().await;
            let completion = Completion::Listed {
                request_id,
                window_id,
                outcome,
            };
            if core.post(CoreEvent::Completed(completion)).is_err() {
                debug!(%request_id, "core stopped before list completed");
            }
        });
        Some(request_id)
    }

    pub fn on_completion(&mut self, windows: &mut WindowManager, completion: Completion) {
        match completion {
            Completion::Saved {
                request_id,
                origin,
                outcome,
            } => self.on_save_completed(windows, request_id, origin, outcome),
            Completion::Listed {
                request_id,
                window_id,
                outcome,
            } => self.on_list_completed(windows, request_id, window_id, outcome),
        }
    }

    fn on_save_completed(
        &mut self,
        windows: &mut WindowManager,
        request_id: RequestId,
        origin: WindowId,
        outcome: Result<StoredCitizen, StoreError>,
    ) {
        match outcome {
            Ok(citizen) => {
                info!(%request_id, citizen_id = citizen.citizen_id.0, "citizen saved");
                reply(windows, origin, WindowEvent::CitizenSaved { citizen });
                // A register window opened after this save started is left alone.
                if windows.get(WindowRole::Register).map(WindowHandle::id) == Some(origin) {
                    windows.close(WindowRole::Register);
                }
            }
            Err(err) => {
                error!(%request_id, code = ?err.code, "failed to save citizen: {}", err.message);
                reply(
                    windows,
                    origin,
                    WindowEvent::CitizenSaveError {
                        message: err.message,
                    },
                );
            }
        }
    }

    fn on_list_completed(
        &mut self,
        windows: &WindowManager,
        request_id: RequestId,
        window_id: WindowId,
        outcome: Result<Vec<StoredCitizen>, StoreError>,
    ) {
        if let Err(err) = &outcome {
            error!(%request_id, code = ?err.code, "failed to list citizens: {}", err.message);
        }

        let Some(gate) = self.list_gates.get_mut(&window_id) else {
            debug!(%request_id, window_id = window_id.0, "discarding list result for closed window");
            return;
        };
        if gate.request_id != request_id {
            debug!(%request_id, "discarding superseded list result");
            return;
        }
        gate.outcome = Some(outcome);
        self.flush_gate(windows, window_id);
    }

    /// Load-complete signal from a window's content.
    pub fn on_window_loaded(&mut self, windows: &WindowManager, load: PageLoad) {
        let window_id = load.window_id;
        match self.list_gates.get_mut(&window_id) {
            Some(gate) if load.generation >= gate.generation => {
                gate.loaded = true;
                self.flush_gate(windows, window_id);
            }
            Some(gate) => debug!(
                request_id = %gate.request_id,
                window_id = window_id.0,
                generation = load.generation,
                "ignoring load from before the list request"
            ),
            None => debug!(window_id = window_id.0, "window loaded with no pending list request"),
        }
    }

    pub fn on_window_closed(&mut self, window_id: WindowId) {
        if let Some(gate) = self.list_gates.remove(&window_id) {
            debug!(
                request_id = %gate.request_id,
                window_id = window_id.0,
                "dropping pending list request for closed window"
            );
        }
    }

    fn flush_gate(&mut self, windows: &WindowManager, window_id: WindowId) {
        let ready = self
            .list_gates
            .get(&window_id)
            .is_some_and(|gate| gate.loaded && gate.outcome.is_some());
        if !ready {
            return;
        }
        let Some(LoadGate {
            request_id,
            outcome: Some(outcome),
            ..
        }) = self.list_gates.remove(&window_id)
        else {
            return;
        };

        let event = match outcome {
            Ok(citizens) => {
                info!(%request_id, count = citizens.len(), "delivering citizen list");
                WindowEvent::CitizensList { citizens }
            }
            Err(err) => WindowEvent::CitizensListError {
                message: err.message,
            },
        };
        reply(windows, window_id, event);
    }
}

fn reply(windows: &WindowManager, window_id: WindowId, event: WindowEvent) -> bool {
    let result = match windows.find(window_id) {
        Some(handle) => handle.send(event),
        None => Err(DeliveryError::WindowMissing {
            window_id,
            channel: event.channel(),
        }),
    };
    match result {
        Ok(()) => true,
        Err(err @ DeliveryError::WindowMissing { .. }) => {
            debug!("{err}");
            false
        }
        Err(err) => {
            warn!("{err}");
            false
        }
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
