//! The stream worker's main loop: read, dispatch, publish, acknowledge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::processor::process_request;
use crate::stream::{RequestStream, TransportError};

/// Drives a [`RequestStream`] to completion: reads batches of requests,
/// dispatches each to the Request Processor, publishes the result, and
/// acknowledges the message even on processing failure.
pub struct StreamWorker<S> {
    stream: S,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl<S: RequestStream> StreamWorker<S> {
    pub fn new(stream: S, config: WorkerConfig) -> Self {
        StreamWorker {
            stream,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle that can be flipped to request a clean shutdown between
    /// loop iterations. Never interrupts an in-flight solve.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Unwraps the worker, returning ownership of its underlying stream.
    /// Used by tests to inspect what was acked/published after a run.
    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Processes at most one batch of messages, useful for smoke-testing a
    /// worker against a live stream without running forever.
    pub fn run_once(&mut self) -> Result<usize, TransportError> {
        self.process_batch()
    }

    /// Runs the main loop until `shutdown_handle()` is set or an unrecoverable
    /// error, whichever comes first. Transport errors are logged and retried
    /// after `reconnect_delay` rather than propagated.
    pub fn run(&mut self) {
        tracing::info!("scheduler service started, waiting for requests...");
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.process_batch() {
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(%error, "redis error");
                    std::thread::sleep(self.config.reconnect_delay);
                }
            }
        }
        tracing::info!("shutting down scheduler service");
    }

    fn process_batch(&mut self) -> Result<usize, TransportError> {
        let entries = self
            .stream
            .read_requests(self.config.read_count, self.config.read_block)?;

        let count = entries.len();
        for entry in entries {
            let Some(payload) = entry.payload else {
                self.stream.ack(&entry.message_id)?;
                continue;
            };

            let result = process_request(&payload);
            let published = serde_json::to_string(&result).unwrap_or_else(|err| {
                tracing::error!(%err, "failed to serialize result envelope");
                "{\"status\":\"error\",\"error\":\"fatal: failed to serialize result\"}".to_string()
            });

            // Publish before ack, matching the source's "publish, then ack in
            // a finally block" ordering; ack always runs even if publish
            // itself hit a transport error, so the message isn't redelivered
            // for a result that may already have gone out.
            if let Err(err) = self.stream.publish_result(&published) {
                tracing::error!(%err, request_id = result.request_id(), "failed to publish result");
            }
            self.stream.ack(&entry.message_id)?;
        }
        Ok(count)
    }
}

/// Installs a Ctrl-C handler that flips `flag` on interrupt, matching the
/// source's `KeyboardInterrupt`-triggers-clean-exit behavior.
pub fn install_interrupt_handler(flag: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::FakeStream;

    fn minimal_payload(id: &str) -> String {
        serde_json::json!({
            "request_id": id,
            "doctors": ["1"],
            "days": [0],
            "shifts": ["s1"],
            "requirements": {"0,s1": 1},
            "availability": {"1,0,s1": 1},
            "shift_durations": {"s1": 8},
            "max_weekly_hours": {"1": 40}
        })
        .to_string()
    }

    #[test]
    fn run_once_acks_every_message_exactly_once() {
        let mut fake = FakeStream::default();
        fake.push("1-0", minimal_payload("r1"));
        fake.push("2-0", minimal_payload("r2"));

        let mut worker = StreamWorker::new(fake, WorkerConfig::from_env());
        let processed = worker.run_once().unwrap();

        assert_eq!(processed, 2);
        assert_eq!(worker.stream.acked, vec!["1-0".to_string(), "2-0".to_string()]);
        assert_eq!(worker.stream.published.len(), 2);
    }

    #[test]
    fn run_once_acks_messages_with_missing_payload_without_publishing() {
        let mut fake = FakeStream::default();
        fake.push_empty("3-0");

        let mut worker = StreamWorker::new(fake, WorkerConfig::from_env());
        let processed = worker.run_once().unwrap();

        assert_eq!(processed, 1);
        assert_eq!(worker.stream.acked, vec!["3-0".to_string()]);
        assert!(worker.stream.published.is_empty());
    }

    #[test]
    fn run_once_acks_even_when_processing_fails() {
        let mut fake = FakeStream::default();
        fake.push("4-0", r#"{"request_id": "r4", "doctors": []}"#);

        let mut worker = StreamWorker::new(fake, WorkerConfig::from_env());
        worker.run_once().unwrap();

        assert_eq!(worker.stream.acked, vec!["4-0".to_string()]);
        assert_eq!(worker.stream.published.len(), 1);
        assert!(worker.stream.published[0].contains("\"status\":\"error\""));
    }
}
