//! The capture loop: source → parse → classify → build → render → emit
//!
//! The loop processes one frame completely before requesting the next one.
//! Its only blocking point is [`FrameSource::next_frame`]; the stop flag is
//! checked before each read, so a live source must use a read timeout for a
//! stop request to be noticed while the interface is idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, trace, warn};

use crate::config::CaptureConfig;
use crate::error::SnifferError;
use crate::format::{render, Zone};
use crate::local::LocalAddrs;
use crate::record::PacketRecord;
use crate::sink::{SharedOutput, Sink};
use crate::source::{CaptureStats, FrameSource};

/// Shared stop request, set from a signal handler or another thread
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> StopFlag {
        StopFlag::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a capture loop ended without error
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndReason {
    /// A stop was requested
    Stopped,
    /// The source has no more frames
    Closed,
}

/// Summary of a finished capture loop
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub end: EndReason,
    pub stats: Option<CaptureStats>,
}

/// Run the capture loop until stopped, until the source closes, or until a
/// fatal error
///
/// Sinks are flushed before returning, on error too.
pub fn run<S, K>(
    source: &mut S,
    sink: &mut K,
    local: &LocalAddrs,
    zone: Zone,
    stop: &StopFlag,
) -> Result<LoopSummary, SnifferError>
where
    S: FrameSource + ?Sized,
    K: Sink + ?Sized,
{
    if !source.linktype().is_supported() {
        warn!(
            "link type {} is not decoded: only lengths will be logged",
            source.linktype()
        );
    }
    let mut frames = 0u64;
    let res = loop {
        if stop.is_stopped() {
            break Ok(EndReason::Stopped);
        }
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(SnifferError::TimedOut) => continue,
            Err(e) if e.is_end_of_capture() => break Ok(EndReason::Closed),
            Err(e) => break Err(e),
        };
        frames += 1;
        trace!("frame {}: {} bytes", frames, frame.caplen());
        let record = PacketRecord::from_frame(&frame, local);
        if let Err(e) = sink.emit(&render(&record, zone)) {
            break Err(e);
        }
    };
    let flushed = sink.flush();
    let stats = source.stats();
    if let Some(s) = stats {
        info!(
            "{} frames logged, {} received, {} dropped, {} dropped by interface",
            frames, s.received, s.dropped, s.if_dropped
        );
    } else {
        info!("{} frames logged", frames);
    }
    let end = res?;
    flushed?;
    debug!("capture loop ended: {:?}", end);
    Ok(LoopSummary { frames, end, stats })
}

/// Run one capture loop per source, each on its own thread, all writing to
/// `output`
///
/// Waits for every loop to end and returns the summaries in source order, or
/// the first error. A failing loop stops the others.
pub fn run_many<S>(
    sources: Vec<S>,
    output: SharedOutput,
    local: &LocalAddrs,
    zone: Zone,
    stop: &StopFlag,
) -> Result<Vec<LoopSummary>, SnifferError>
where
    S: FrameSource + Send + 'static,
{
    let handles: Vec<_> = sources
        .into_iter()
        .enumerate()
        .map(|(n, mut source)| {
            let mut sink = output.clone();
            let local = local.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name(format!("capture-{}", n))
                .spawn(move || {
                    let res = run(&mut source, &mut sink, &local, zone, &stop);
                    if let Err(ref e) = res {
                        error!("capture loop {} failed: {}", n, e);
                        stop.stop();
                    }
                    res
                })
        })
        .collect::<Result<_, _>>()?;
    let mut summaries = Vec::with_capacity(handles.len());
    let mut first_err = None;
    for h in handles {
        match h.join() {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(_) => {
                let e = SnifferError::Read("capture thread panicked".to_string());
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(summaries),
    }
}

#[cfg(feature = "live")]
fn open_live(
    config: &CaptureConfig,
) -> Result<(Vec<crate::source::LiveSource>, LocalAddrs), SnifferError> {
    use crate::source::{interface_addrs, LiveSource};

    let mut sources = Vec::with_capacity(config.interfaces.len());
    let mut iface_addrs = Vec::new();
    for iface in &config.interfaces {
        sources.push(LiveSource::open(iface, config)?);
        iface_addrs.extend(interface_addrs(iface)?);
    }
    let local = LocalAddrs::resolve(config.local_addrs.iter().copied(), iface_addrs);
    Ok((sources, local))
}

/// Run a capture session described by `config`
///
/// Replays `config.savefile` if set, otherwise captures on every interface
/// of `config.interfaces`. Blocks until the session ends.
pub fn run_session(
    config: &CaptureConfig,
    output: SharedOutput,
    stop: &StopFlag,
) -> Result<Vec<LoopSummary>, SnifferError> {
    if let Some(ref path) = config.savefile {
        let mut source = crate::source::ReplaySource::open(path)?;
        let local = LocalAddrs::resolve(config.local_addrs.iter().copied(), std::iter::empty());
        info!("replaying {}", path.display());
        let mut sink = output;
        return run(&mut source, &mut sink, &local, config.zone, stop).map(|s| vec![s]);
    }
    if config.interfaces.is_empty() {
        return Err(SnifferError::InterfaceNotFound("<none>".to_string()));
    }
    #[cfg(feature = "live")]
    {
        let (sources, local) = open_live(config)?;
        debug!("local addresses: {:?}", local.sorted());
        run_many(sources, output, &local, config.zone, stop)
    }
    #[cfg(not(feature = "live"))]
    {
        let _ = output;
        Err(SnifferError::LiveUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawFrame;
    use crate::linktype::Linktype;
    use crate::sink::Output;
    use chrono::DateTime;
    use std::collections::VecDeque;
    use std::io::{self, Write};
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    /// Source replaying queued results, then closing
    struct Queue(VecDeque<Result<RawFrame, SnifferError>>);

    impl FrameSource for Queue {
        fn next_frame(&mut self) -> Result<RawFrame, SnifferError> {
            self.0.pop_front().unwrap_or(Err(SnifferError::Closed))
        }
        fn linktype(&self) -> Linktype {
            Linktype::ETHERNET
        }
    }

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, b: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(b);
            Ok(b.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn short_frame() -> RawFrame {
        RawFrame::new(DateTime::UNIX_EPOCH, vec![0u8; 8])
    }

    #[test]
    fn runs_until_closed() {
        let buf = Buf::default();
        let mut sink = Output::new(Box::new(buf.clone()));
        let mut source = Queue(
            vec![Ok(short_frame()), Err(SnifferError::TimedOut), Ok(short_frame())].into(),
        );
        let local: LocalAddrs = vec![Ipv4Addr::new(10, 0, 0, 1)].into_iter().collect();
        let summary = run(&mut source, &mut sink, &local, Zone::Utc, &StopFlag::new()).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.end, EndReason::Closed);
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "[1970-01-01 00:00:00.000] OTHER-UNKNOWN: 8 Bytes\n\
             [1970-01-01 00:00:00.000] OTHER-UNKNOWN: 8 Bytes\n"
        );
    }

    #[test]
    fn read_error_is_fatal() {
        let mut sink = Output::new(Box::new(Buf::default()));
        let mut source = Queue(
            vec![
                Ok(short_frame()),
                Err(SnifferError::Read("gone".to_string())),
                Ok(short_frame()),
            ]
            .into(),
        );
        let res = run(
            &mut source,
            &mut sink,
            &LocalAddrs::default(),
            Zone::Utc,
            &StopFlag::new(),
        );
        assert!(matches!(res, Err(SnifferError::Read(_))));
        assert_eq!(source.0.len(), 1);
    }

    #[test]
    fn stop_flag_ends_loop() {
        let stop = StopFlag::new();
        stop.stop();
        let mut sink = Output::new(Box::new(Buf::default()));
        let mut source = Queue(vec![Ok(short_frame())].into());
        let summary = run(&mut source, &mut sink, &LocalAddrs::default(), Zone::Utc, &stop).unwrap();
        assert_eq!(summary.end, EndReason::Stopped);
        assert_eq!(summary.frames, 0);
    }

    #[test]
    fn many_sources_share_output() {
        let buf = Buf::default();
        let output = Output::new(Box::new(buf.clone())).shared();
        let sources: Vec<Queue> = (0..3)
            .map(|_| Queue((0..5).map(|_| Ok(short_frame())).collect()))
            .collect();
        let summaries = run_many(
            sources,
            output,
            &LocalAddrs::default(),
            Zone::Utc,
            &StopFlag::new(),
        )
        .unwrap();
        assert_eq!(summaries.iter().map(|s| s.frames).sum::<u64>(), 15);
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.lines().count(), 15);
    }
}
