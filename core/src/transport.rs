//! The transport boundary.
//!
//! # Design
//! The client never opens sockets itself. A `Transport` receives each
//! request by value together with a `Completion`, performs the exchange
//! however it likes (its own threads, an event loop, a test script) and
//! answers exactly once through the completion. `Completion::complete`
//! consumes the handle, so a second answer cannot be written. A transport
//! that drops the handle without answering settles the call with
//! `TransportError(CompletionDropped)` rather than leaving it hanging.

use tokio::sync::oneshot;

use crate::http::{HttpRequest, TransportReply};

/// Executes requests and reports each outcome through its `Completion`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest, completion: Completion);
}

impl<F> Transport for F
where
    F: Fn(HttpRequest, Completion) + Send + Sync,
{
    fn execute(&self, request: HttpRequest, completion: Completion) {
        self(request, completion)
    }
}

/// One-shot reply handle for a single dispatched request.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<TransportReply>,
}

impl Completion {
    pub(crate) fn new(tx: oneshot::Sender<TransportReply>) -> Self {
        Completion { tx }
    }

    /// Settle the call. Safe to call from any thread.
    pub fn complete(self, reply: TransportReply) {
        if self.tx.send(reply).is_err() {
            tracing::debug!("reply arrived after the caller dropped its pending result");
        }
    }

    /// True once the caller has dropped its `Pending`; the transport may
    /// skip the work.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(feature = "ureq")]
mod ureq_impl {
    use std::thread;

    use super::*;
    use crate::http::{HttpMethod, RawResponse};

    /// Blocking `ureq` agent driven from one worker thread per request.
    ///
    /// The agent is configured to hand back 4xx/5xx responses as data so the
    /// dispatch pipeline does the status classification.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            UreqTransport { agent }
        }

        /// Use a preconfigured agent. It must have `http_status_as_error`
        /// disabled, or error statuses surface as transport errors.
        pub fn with_agent(agent: ureq::Agent) -> Self {
            UreqTransport { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: HttpRequest, completion: Completion) {
            let agent = self.agent.clone();
            let spawned = thread::Builder::new()
                .name("courier-ureq".to_string())
                .spawn(move || {
                    if completion.is_abandoned() {
                        return;
                    }
                    completion.complete(exchange(&agent, request));
                });
            if let Err(e) = spawned {
                tracing::error!(error = %e, "failed to spawn transport thread");
            }
        }
    }

    fn exchange(agent: &ureq::Agent, request: HttpRequest) -> TransportReply {
        let url = request.url.as_str();
        let headers = &request.headers;
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(agent.get(url), headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(agent.delete(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Delete, None) => with_headers(agent.delete(url), headers).call(),
            (HttpMethod::Post, Some(body)) => with_headers(agent.post(url), headers).send(body),
            (HttpMethod::Post, None) => with_headers(agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(agent.put(url), headers).send(body),
            (HttpMethod::Put, None) => with_headers(agent.put(url), headers).send_empty(),
        };

        let mut response = match result {
            Ok(response) => response,
            Err(e) => return TransportReply::failed(e),
        };
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        match response.body_mut().read_to_vec() {
            Ok(body) => TransportReply::http(status, headers, Some(body)),
            Err(e) => TransportReply {
                body: None,
                response: Some(RawResponse::Http { status, headers }),
                error: Some(Box::new(e)),
            },
        }
    }

    fn with_headers<B>(
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

#[cfg(feature = "ureq")]
pub use ureq_impl::UreqTransport;
