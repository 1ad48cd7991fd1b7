//! Redis stream worker: polls a durable request stream, dispatches each
//! message to the Request Processor, publishes the result, and acknowledges
//! with at-least-once semantics.

pub mod config;
pub mod processor;
pub mod stream;
pub mod worker;

pub use config::{consumer_name, WorkerConfig};
pub use processor::process_request;
pub use stream::{FakeStream, RedisStream, RequestStream, TransportError};
pub use worker::{install_interrupt_handler, StreamWorker};
