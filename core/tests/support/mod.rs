//! Shared helpers for the core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use courier_core::{Completion, HttpRequest, Transport, TransportReply};
use serde::{Deserialize, Serialize};

/// Records every request and holds on to its completion until the test
/// answers it, so replies can be delivered in any order.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

struct Recorded {
    request: HttpRequest,
    completion: Option<Completion>,
}

impl Transport for RecordingTransport {
    fn execute(&self, request: HttpRequest, completion: Completion) {
        self.calls.lock().unwrap().push(Recorded {
            request,
            completion: Some(completion),
        });
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests the transport has been asked to execute.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> HttpRequest {
        self.calls.lock().unwrap()[index].request.clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        let calls = self.calls.lock().unwrap();
        calls.last().expect("no request recorded").request.clone()
    }

    /// Answer the call at `index`. Panics if it was already answered.
    pub fn reply(&self, index: usize, reply: TransportReply) {
        let completion = self.calls.lock().unwrap()[index]
            .completion
            .take()
            .expect("call already answered");
        completion.complete(reply);
    }

    /// Answer the most recent call.
    pub fn reply_last(&self, reply: TransportReply) {
        let index = self.calls() - 1;
        self.reply(index, reply);
    }

    pub fn reply_last_json(&self, status: u16, body: &str) {
        self.reply_last(TransportReply::http(
            status,
            vec![("content-type".to_string(), "application/json".to_string())],
            Some(body.as_bytes().to_vec()),
        ));
    }

    /// Drop the completion at `index` without answering.
    pub fn abandon(&self, index: usize) {
        self.calls.lock().unwrap()[index].completion.take();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

pub fn person() -> Person {
    Person {
        name: "King of Symmetry".to_string(),
        age: 57,
    }
}

/// Declared in camelCase; the snake-casing policy maps it to the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    pub follower_count: u32,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
