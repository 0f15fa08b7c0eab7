use std::io;

use thiserror::Error;

/// Errors raised by frame sources, sinks and the capture loop
///
/// Malformed packets are never reported here: the header parser absorbs them
/// as absent layers.
#[derive(Debug, Error)]
pub enum SnifferError {
    /// The requested interface does not exist on this host
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),
    /// The interface exists but could not be opened (usually privileges)
    #[error("cannot open interface {iface}: {reason}")]
    Open { iface: String, reason: String },
    /// End of capture: savefile exhausted, or the backend has no more packets
    #[error("capture closed")]
    Closed,
    /// No frame arrived within the read timeout; the caller may retry
    #[error("read timeout expired")]
    TimedOut,
    /// The capture handle failed mid-stream
    #[error("capture read error: {0}")]
    Read(String),
    /// Savefile header or record could not be decoded
    #[error("invalid capture file: {0}")]
    InvalidCapture(&'static str),
    /// Interface capture requested in a build without the `live` feature
    #[error("live capture support not compiled in (enable the `live` feature)")]
    LiveUnsupported,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SnifferError {
    /// Returns true if the error ends the capture loop without being a failure
    pub fn is_end_of_capture(&self) -> bool {
        matches!(self, SnifferError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = SnifferError::Open {
            iface: "eth0".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(e.to_string(), "cannot open interface eth0: permission denied");
        assert!(SnifferError::Closed.is_end_of_capture());
        assert!(!SnifferError::TimedOut.is_end_of_capture());
    }
}
