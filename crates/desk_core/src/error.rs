use shared::domain::{WindowId, WindowRole};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("window host refused to open {role} window: {message}")]
    HostRejected { role: WindowRole, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("window {} is missing; dropping {channel}", .window_id.0)]
    WindowMissing {
        window_id: WindowId,
        channel: &'static str,
    },
    #[error("event queue for window {} is full; dropping {channel}", .window_id.0)]
    QueueFull {
        window_id: WindowId,
        channel: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("core event loop has stopped")]
pub struct CoreClosed;
