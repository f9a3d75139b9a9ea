//! Event publisher adapters and the client event consumer.

mod consumer;
mod memory;
mod postgres;

pub use consumer::{ClientEventsConsumer, ConsumeError, run_bus_listener, run_pg_listener};
pub use memory::{BusMessage, InProcessEventBus};
pub use postgres::PgNotifyPublisher;
