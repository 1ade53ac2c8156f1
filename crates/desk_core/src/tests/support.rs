use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use crossbeam_channel::Receiver;
use shared::{
    domain::{CitizenId, CitizenRecord, StoredCitizen, WindowId, WindowRole},
    error::StoreError,
    protocol::WindowEvent,
    store::CitizenStore,
};

use crate::{
    error::WindowError,
    runtime::{channel, Core, CoreHandle},
    window::{PageLoad, WindowHost, WindowSpec, WindowSpecs},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Open(WindowId, WindowRole),
    Show(WindowId),
    Reload(WindowId),
    Close(WindowId),
}

#[derive(Default)]
pub struct FakeHost {
    calls: Mutex<Vec<HostCall>>,
    specs: Mutex<HashMap<WindowId, WindowSpec>>,
    receivers: Mutex<HashMap<WindowId, Receiver<WindowEvent>>>,
    loads: Mutex<HashMap<WindowId, PageLoad>>,
    reject: Mutex<Option<WindowRole>>,
}

impl FakeHost {
    pub fn reject(&self, role: WindowRole) {
        *self.reject.lock().expect("reject lock") = Some(role);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn opened(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HostCall::Open(..)))
            .count()
    }

    pub fn spec(&self, window_id: WindowId) -> WindowSpec {
        self.specs.lock().expect("specs lock")[&window_id].clone()
    }

    /// The navigation most recently started for `window_id`.
    pub fn latest_load(&self, window_id: WindowId) -> PageLoad {
        self.loads.lock().expect("loads lock")[&window_id]
    }

    /// Everything the core has queued for `window_id` so far.
    pub fn drain(&self, window_id: WindowId) -> Vec<WindowEvent> {
        let receivers = self.receivers.lock().expect("receivers lock");
        match receivers.get(&window_id) {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl WindowHost for FakeHost {
    fn open(
        &self,
        load: PageLoad,
        role: WindowRole,
        spec: &WindowSpec,
        events: Receiver<WindowEvent>,
    ) -> Result<(), WindowError> {
        if *self.reject.lock().expect("reject lock") == Some(role) {
            return Err(WindowError::HostRejected {
                role,
                message: "display unavailable".into(),
            });
        }
        let window_id = load.window_id;
        self.loads
            .lock()
            .expect("loads lock")
            .insert(window_id, load);
        self.calls
            .lock()
            .expect("calls lock")
            .push(HostCall::Open(window_id, role));
        self.specs
            .lock()
            .expect("specs lock")
            .insert(window_id, spec.clone());
        self.receivers
            .lock()
            .expect("receivers lock")
            .insert(window_id, events);
        Ok(())
    }

    fn show(&self, window_id: WindowId) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(HostCall::Show(window_id));
    }

    fn reload(&self, load: PageLoad) {
        self.loads
            .lock()
            .expect("loads lock")
            .insert(load.window_id, load);
        self.calls
            .lock()
            .expect("calls lock")
            .push(HostCall::Reload(load.window_id));
    }

    fn close(&self, window_id: WindowId) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(HostCall::Close(window_id));
    }
}

pub struct FakeStore {
    citizens: Vec<StoredCitizen>,
    save_error: Option<StoreError>,
    list_error: Option<StoreError>,
    next_id: AtomicI64,
    pub save_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl FakeStore {
    pub fn with_citizens(count: usize) -> Self {
        let citizens = (1..=count as i64)
            .map(|id| StoredCitizen {
                citizen_id: CitizenId(id),
                record: record(&format!("citizen-{id}")),
                created_at: Utc::now(),
            })
            .collect::<Vec<_>>();
        Self {
            next_id: AtomicI64::new(count as i64 + 1),
            citizens,
            save_error: None,
            list_error: None,
            save_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_save(err: StoreError) -> Self {
        Self {
            save_error: Some(err),
            ..Self::with_citizens(0)
        }
    }

    pub fn failing_list(err: StoreError) -> Self {
        Self {
            list_error: Some(err),
            ..Self::with_citizens(0)
        }
    }
}

#[async_trait]
impl CitizenStore for FakeStore {
    async fn save(&self, record: CitizenRecord) -> Result<StoredCitizen, StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.save_error {
            return Err(err.clone());
        }
        Ok(StoredCitizen {
            citizen_id: CitizenId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            record,
            created_at: Utc::now(),
        })
    }

    async fn list_all(&self) -> Result<Vec<StoredCitizen>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.citizens.clone()),
        }
    }
}

pub fn record(name: &str) -> CitizenRecord {
    CitizenRecord::try_from(serde_json::json!({ "name": name })).expect("object record")
}

pub struct Harness {
    pub core: Core,
    pub handle: CoreHandle,
    pub host: Arc<FakeHost>,
    pub store: Arc<FakeStore>,
}

impl Harness {
    pub fn new(store: FakeStore) -> Self {
        let (handle, intake) = channel();
        let host = Arc::new(FakeHost::default());
        let store = Arc::new(store);
        let core = Core::new(
            handle.clone(),
            intake,
            host.clone(),
            store.clone(),
            WindowSpecs::default(),
        );
        Self {
            core,
            handle,
            host,
            store,
        }
    }

    /// Harness with the main window already open.
    pub fn started(store: FakeStore) -> (Self, WindowId) {
        let mut harness = Self::new(store);
        let main = harness.core.start().expect("main window");
        (harness, main)
    }

    /// Handles exactly `events` more core events, waiting for spawned store
    /// calls to report back where needed.
    pub async fn settle(&mut self, events: usize) {
        for _ in 0..events {
            let running = tokio::time::timeout(Duration::from_secs(2), self.core.step())
                .await
                .expect("core stalled waiting for an event");
            assert!(running, "core stopped unexpectedly");
        }
    }

    /// Posts load-complete for the latest navigation of `window_id`.
    pub fn finish_load(&self, window_id: WindowId) {
        self.handle
            .window_loaded(self.host.latest_load(window_id))
            .expect("post");
    }

    pub fn window(&self, role: WindowRole) -> Option<WindowId> {
        self.core.windows().get(role).map(|handle| handle.id())
    }
}
