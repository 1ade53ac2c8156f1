//! Event and window-lifecycle core of the citizen desk: window registry,
//! request/reply bridge to the citizen store, menu dispatch, and the serial
//! line feed, all driven by one run-to-completion event loop.

pub mod bridge;
pub mod error;
pub mod menu;
pub mod runtime;
pub mod serial;
pub mod window;

pub use bridge::{Completion, EventBridge, ListOrigin, RequestId};
pub use error::{ConnectionError, CoreClosed, DeliveryError, WindowError};
pub use menu::{MenuCommand, MenuController};
pub use runtime::{channel, Core, CoreEvent, CoreHandle, CoreIntake};
pub use serial::{spawn_serial_feed, SerialFeed, SerialLine, SerialSettings};
pub use window::{PageLoad, WindowHandle, WindowHost, WindowManager, WindowSpec, WindowSpecs};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
