//! Raw frame sources
//!
//! A [`FrameSource`] yields captured frames one at a time. The header parser
//! and everything above it only depend on this trait, so the pipeline can be
//! driven by a live interface, a savefile or synthetic frames.

#[cfg(feature = "live")]
mod live;
mod replay;

#[cfg(feature = "live")]
pub use live::*;
pub use replay::*;

use crate::error::SnifferError;
use crate::frame::RawFrame;
use crate::linktype::Linktype;

/// Packet counters reported by a capture backend
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CaptureStats {
    /// Packets received by the backend
    pub received: u32,
    /// Packets dropped because the capture buffer was full
    pub dropped: u32,
    /// Packets dropped by the interface or its driver
    pub if_dropped: u32,
}

/// Generic interface for frame acquisition
pub trait FrameSource {
    /// Block until the next frame is available
    ///
    /// Returns [`SnifferError::Closed`] at the end of the capture and
    /// [`SnifferError::TimedOut`] if no frame arrived within the read timeout.
    /// Any other error is fatal.
    fn next_frame(&mut self) -> Result<RawFrame, SnifferError>;

    /// Data link type of the frames
    fn linktype(&self) -> Linktype;

    /// Counters from the backend, if it keeps any
    fn stats(&mut self) -> Option<CaptureStats> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<RawFrame, SnifferError> {
        (**self).next_frame()
    }

    fn linktype(&self) -> Linktype {
        (**self).linktype()
    }

    fn stats(&mut self) -> Option<CaptureStats> {
        (**self).stats()
    }
}
