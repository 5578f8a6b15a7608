//! Shared types for the e2e test framework

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared state for one mock backend
#[derive(Debug, Default)]
pub struct BackendState {
    /// All requests received by the backend (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
}

/// A request the mock backend received
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    /// Path plus query, exactly as it arrived
    pub path: String,
    /// Header values keyed by lowercase name
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// Response as seen by the client of the balancer
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: u16,
    /// Value of the `x-backend` header, if a backend answered
    pub backend: Option<String>,
    pub body: String,
}

/// Result of a single test case
#[derive(Debug)]
#[allow(dead_code)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
