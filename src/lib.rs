//! # Packet sniffer
//!
//! This crate captures network traffic, decodes the Ethernet, IPv4 and
//! TCP/UDP/ICMP headers of each frame, classifies its direction relative to
//! the host and logs one fixed-format block per packet.
//!
//! The work is split into a pipeline of small stages:
//!
//! - a [`FrameSource`](source::FrameSource) yields [`RawFrame`]s: live from an
//!   interface ([`LiveSource`](source::LiveSource), `live` feature) or from a
//!   pcap savefile ([`ReplaySource`](source::ReplaySource));
//! - the [`headers`] parser decodes each frame into [`ParsedHeaders`], marking
//!   truncated or unknown layers as absent instead of failing;
//! - [`classify`] labels the packet `IN`, `OUT` or `UNKNOWN` against the
//!   [`LocalAddrs`];
//! - [`PacketRecord::build`] assembles the record, and [`render`] formats it;
//! - a [`Sink`](sink::Sink) writes the block to the console and an optional
//!   log file.
//!
//! [`capture::run`] drives the stages for one source until it is stopped.
//!
//! # Example: classifying a frame
//!
//! ```rust
//! use packet_sniffer::*;
//! use std::net::Ipv4Addr;
//!
//! # let frame: Vec<u8> = vec![0; 60];
//! let local: LocalAddrs = vec![Ipv4Addr::new(192, 168, 1, 46)].into_iter().collect();
//! let headers = parse_ethernet_frame(&frame);
//! let direction = classify(&headers, &local);
//! let record = PacketRecord::build(chrono::Utc::now(), &headers, direction, frame.len() as u32);
//! print!("{}", render(&record, Zone::Local));
//! ```
//!
//! # Example: replaying a savefile
//!
//! ```rust,no_run
//! use packet_sniffer::capture::{run, StopFlag};
//! use packet_sniffer::sink::Output;
//! use packet_sniffer::source::ReplaySource;
//! use packet_sniffer::{LocalAddrs, Zone};
//! use std::net::Ipv4Addr;
//!
//! let mut source = ReplaySource::open("capture.pcap").expect("ReplaySource");
//! let mut output = Output::console();
//! let local = LocalAddrs::resolve([Ipv4Addr::new(10, 0, 0, 1)], std::iter::empty());
//! let summary = run(&mut source, &mut output, &local, Zone::Utc, &StopFlag::new())
//!     .expect("capture loop");
//! println!("{} frames", summary.frames);
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod headers;
pub mod sink;
pub mod source;

mod direction;
mod format;
mod frame;
mod linktype;
mod local;
mod record;
pub use direction::*;
pub use format::*;
pub use frame::*;
pub use headers::{parse, parse_ethernet_frame, ParsedHeaders};
pub use linktype::*;
pub use local::*;
pub use record::*;

#[cfg(feature = "serialize")]
pub mod serialize;
