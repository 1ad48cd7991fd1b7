//! Stream transport abstraction and the Redis-backed implementation.
//!
//! [`RequestStream`] is the seam the worker loop runs against; [`RedisStream`]
//! implements it over a real Redis connection (consumer-group semantics,
//! at-least-once delivery), and [`FakeStream`] (test-only) is an in-memory
//! stand-in used to exercise exactly-once-ack behavior without a broker.

use std::collections::VecDeque;
use std::time::Duration;

use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::Commands;
use thiserror::Error;

use crate::config::WorkerConfig;

/// A failure at the stream transport layer.
///
/// Never surfaced per-request; it triggers the worker's reconnect/backoff
/// loop instead of a result envelope.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("redis transport error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A single request entry read from the stream: its message id and the raw
/// `payload` field, if present.
pub struct RequestEntry {
    pub message_id: String,
    pub payload: Option<String>,
}

/// The seam between the worker loop and the underlying message transport.
pub trait RequestStream {
    fn read_requests(&mut self, count: usize, block: Duration) -> Result<Vec<RequestEntry>, TransportError>;
    fn ack(&mut self, message_id: &str) -> Result<(), TransportError>;
    fn publish_result(&mut self, payload: &str) -> Result<(), TransportError>;
}

/// A Redis Streams-backed transport using a consumer group for at-least-once
/// delivery, mirroring the source's `RedisStreamClient`.
pub struct RedisStream {
    connection: redis::Connection,
    request_stream: String,
    result_stream: String,
    group: String,
    consumer: String,
}

impl RedisStream {
    /// Connects to Redis and ensures the request stream and consumer group
    /// exist, treating "group already exists" as success.
    pub fn connect(config: &WorkerConfig, consumer: String) -> Result<Self, TransportError> {
        let client = redis::Client::open(config.redis_url())?;
        let mut connection = client.get_connection()?;

        let created: Result<(), redis::RedisError> =
            connection.xgroup_create_mkstream(&config.request_stream, &config.consumer_group, "0");
        if let Err(err) = created {
            if !err.to_string().contains("BUSYGROUP") {
                return Err(err.into());
            }
        }

        Ok(RedisStream {
            connection,
            request_stream: config.request_stream.clone(),
            result_stream: config.result_stream.clone(),
            group: config.consumer_group.clone(),
            consumer,
        })
    }
}

impl RequestStream for RedisStream {
    fn read_requests(&mut self, count: usize, block: Duration) -> Result<Vec<RequestEntry>, TransportError> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(count)
            .block(block.as_millis() as usize);

        let reply: StreamReadReply =
            self.connection
                .xread_options(&[&self.request_stream], &[">"], &options)?;

        let mut entries = Vec::new();
        for stream_key in reply.keys {
            for id in stream_key.ids {
                let payload = id
                    .map
                    .get("payload")
                    .and_then(|value| match value {
                        redis::Value::BulkString(bytes) => String::from_utf8(bytes.clone()).ok(),
                        redis::Value::SimpleString(s) => Some(s.clone()),
                        _ => None,
                    });
                entries.push(RequestEntry {
                    message_id: id.id,
                    payload,
                });
            }
        }
        Ok(entries)
    }

    fn ack(&mut self, message_id: &str) -> Result<(), TransportError> {
        let _: i64 = self
            .connection
            .xack(&self.request_stream, &self.group, &[message_id])?;
        Ok(())
    }

    fn publish_result(&mut self, payload: &str) -> Result<(), TransportError> {
        let _: String = self
            .connection
            .xadd(&self.result_stream, "*", &[("payload", payload)])?;
        Ok(())
    }
}

/// An in-memory [`RequestStream`] used by worker tests to assert
/// exactly-once-ack behavior and result publication without a real broker.
#[derive(Default)]
pub struct FakeStream {
    pub pending: VecDeque<RequestEntry>,
    pub acked: Vec<String>,
    pub published: Vec<String>,
}

impl FakeStream {
    pub fn push(&mut self, message_id: impl Into<String>, payload: impl Into<String>) {
        self.pending.push_back(RequestEntry {
            message_id: message_id.into(),
            payload: Some(payload.into()),
        });
    }

    pub fn push_empty(&mut self, message_id: impl Into<String>) {
        self.pending.push_back(RequestEntry {
            message_id: message_id.into(),
            payload: None,
        });
    }
}

impl RequestStream for FakeStream {
    fn read_requests(&mut self, count: usize, _block: Duration) -> Result<Vec<RequestEntry>, TransportError> {
        let mut out = Vec::new();
        while out.len() < count {
            match self.pending.pop_front() {
                Some(entry) => out.push(entry),
                None => break,
            }
        }
        Ok(out)
    }

    fn ack(&mut self, message_id: &str) -> Result<(), TransportError> {
        self.acked.push(message_id.to_string());
        Ok(())
    }

    fn publish_result(&mut self, payload: &str) -> Result<(), TransportError> {
        self.published.push(payload.to_string());
        Ok(())
    }
}
