//! Notifications module
//!
//! Outbound shop notifications are published on a broadcast bus; the mail
//! delivery worker subscribes and renders them.
//!
//! # Usage
//! ```ignore
//! use shoppingcart::notifications::create_event_bus;
//!
//! let event_bus = create_event_bus();
//! let mut worker = event_bus.subscribe();
//! // pass `event_bus.clone()` as the shop's NotificationPort
//! while let Some(message) = worker.recv().await {
//!     deliver(message.event.notification()).await;
//! }
//! ```

pub mod event_bus;
pub mod events;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::*;
