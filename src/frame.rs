use chrono::{DateTime, TimeZone, Utc};

use crate::linktype::Linktype;

/// A frame as delivered by a capture backend
///
/// The frame owns its bytes; it is consumed by the header parser and dropped
/// once the packet record has been built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// Capture time
    pub ts: DateTime<Utc>,
    /// Captured bytes. Can be shorter than `orig_len` if the snapshot length
    /// truncated the frame
    pub data: Vec<u8>,
    /// The length of the frame as it appeared on the network
    pub orig_len: u32,
    /// Data link type of the source that captured this frame
    pub linktype: Linktype,
}

impl RawFrame {
    /// Create an Ethernet frame captured at `ts`, not truncated
    pub fn new(ts: DateTime<Utc>, data: Vec<u8>) -> RawFrame {
        let orig_len = data.len() as u32;
        RawFrame {
            ts,
            data,
            orig_len,
            linktype: Linktype::ETHERNET,
        }
    }

    /// Create a frame from a pcap-style timestamp (seconds and sub-second
    /// fraction expressed in `units_per_sec`)
    pub fn from_pcap_ts(
        ts_sec: i64,
        ts_frac: u32,
        units_per_sec: u64,
        data: Vec<u8>,
        orig_len: u32,
        linktype: Linktype,
    ) -> RawFrame {
        RawFrame {
            ts: build_ts(ts_sec, ts_frac, units_per_sec),
            data,
            orig_len,
            linktype,
        }
    }

    /// Number of bytes actually captured
    #[inline]
    pub fn caplen(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the snapshot length cut the frame short
    #[inline]
    pub fn is_truncated(&self) -> bool {
        (self.data.len() as u64) < u64::from(self.orig_len)
    }
}

/// Given the timestamp parameters, return the timestamp as a UTC date
///
/// Out of range values fall back to the Unix epoch.
pub fn build_ts(ts_sec: i64, ts_frac: u32, units_per_sec: u64) -> DateTime<Utc> {
    let nanos = if units_per_sec == 0 {
        0
    } else {
        (u64::from(ts_frac) * 1_000_000_000 / units_per_sec).min(999_999_999) as u32
    };
    Utc.timestamp_opt(ts_sec, nanos)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}
