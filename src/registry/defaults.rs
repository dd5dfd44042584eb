use crate::config::ServiceEntry;
use std::path::PathBuf;

/// Startup timeout used when a service entry does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Built-in service set, in startup order.
///
/// The chatbot gateway comes first; the backend talks to it.
pub fn default_services() -> Vec<ServiceEntry> {
    vec![
        ServiceEntry {
            name: "chatbot".to_string(),
            command: vec!["python".to_string(), "app.py".to_string()],
            dir: PathBuf::from("backend/chatbot"),
            health_url: "http://localhost:5000/health".to_string(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        },
        ServiceEntry {
            name: "backend".to_string(),
            command: vec!["npm".to_string(), "start".to_string()],
            dir: PathBuf::from("backend"),
            health_url: "http://localhost:8080/health".to_string(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        },
    ]
}
