//! In-process fake transport for unit tests
//!
//! [`FakeTransport`] answers every request by calling a responder closure
//! and records what was sent, so tests can drive the client and the refresh
//! client without a network.
//!
//! ```text
//! client send() ---> responder(&request) ---> ResponseDescriptor
//!                \-> sent log (read back with `sent()`)
//! ```

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::transport::{RequestDescriptor, ResponseDescriptor, Transport};

type Responder = Box<dyn Fn(&RequestDescriptor) -> Result<ResponseDescriptor> + Send + Sync>;

/// Scripted transport used by unit tests.
pub struct FakeTransport {
    responder: Responder,
    delay: Option<Duration>,
    sent: Mutex<Vec<RequestDescriptor>>,
}

impl FakeTransport {
    /// Answers each request with whatever `responder` returns.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> Result<ResponseDescriptor> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with the same status and body.
    pub fn always(status: u16, body: &'static str) -> Self {
        Self::new(move |_| Ok(ResponseDescriptor::new(status, Bytes::from_static(body.as_bytes()))))
    }

    /// Sleeps for `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request sent so far, in order.
    pub fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("delay", &self.delay)
            .field("sent", &self.sent_count())
            .finish()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<ResponseDescriptor> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}
