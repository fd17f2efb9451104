//! Host identification for GPUWatch collectors

use tracing::warn;

/// Node name reported when the hostname cannot be read
pub const FALLBACK_NODE_NAME: &str = "unknown-host";

/// Hostname used to stamp every telemetry snapshot.
pub fn node_name() -> String {
    match gethostname::gethostname().into_string() {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        Ok(_) => {
            warn!("empty hostname, reporting as {}", FALLBACK_NODE_NAME);
            FALLBACK_NODE_NAME.to_string()
        }
        Err(raw) => {
            warn!("hostname {:?} is not valid UTF-8, reporting as {}", raw, FALLBACK_NODE_NAME);
            FALLBACK_NODE_NAME.to_string()
        }
    }
}
