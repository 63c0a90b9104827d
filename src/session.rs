//! Resilient managed session: pending queue, reconnect maintenance,
//! subscription synchronization and queue persistence.

pub mod engine;
pub mod events;
pub mod message;
pub mod options;
pub mod queue;
pub mod storage;

pub use engine::{ConnectionOutcome, ManagedSession, SessionError};
pub use events::{
	ConnectingFailedEvent, ConnectionStateChangedEvent, Listeners,
	MessageProcessedEvent, MessageSkippedEvent, PublishInterceptor,
	SessionEvents, SubscriptionsChangedEvent, SynchronizationFailedEvent,
};
pub use message::QueuedMessage;
pub use options::{OverflowStrategy, SessionOptions};
pub use queue::MessageQueue;
pub use storage::{InMemorySessionStorage, SessionStorage, StorageError};
