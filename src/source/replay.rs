use std::fs::File;
use std::io::Read;
use std::path::Path;

use circular::Buffer;
use log::{debug, trace};
use nom::bytes::streaming::take;
use nom::error::{make_error, ErrorKind};
use nom::number::streaming::{self as number, le_u32};
use nom::number::Endianness;
use nom::{IResult, Needed, Offset};

use super::FrameSource;
use crate::error::SnifferError;
use crate::frame::RawFrame;
use crate::linktype::Linktype;

/// Initial size of the read buffer
pub const DEFAULT_CAPACITY: usize = 1 << 18;
/// The buffer never grows beyond this size
const MAX_CAPACITY: usize = 1 << 24;

const MAGIC_USEC: u32 = 0xa1b2_c3d4;
const MAGIC_NSEC: u32 = 0xa1b2_3c4d;
const MAGIC_MODIFIED: u32 = 0xa1b2_cd34;
const MAGIC_USEC_SWAPPED: u32 = 0xd4c3_b2a1;
const MAGIC_NSEC_SWAPPED: u32 = 0x4d3c_b2a1;

/// Global header of a legacy pcap savefile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavefileHeader {
    /// File format and byte ordering, as read in little-endian
    pub magic_number: u32,
    pub version_major: u16,
    pub version_minor: u16,
    /// Correction in seconds between UTC and the timestamps (always 0 in practice)
    pub thiszone: i32,
    pub sigfigs: u32,
    /// Max length of captured packets, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: Linktype,
}

impl SavefileHeader {
    pub const fn size(&self) -> usize {
        24
    }

    pub fn is_bigendian(&self) -> bool {
        (self.magic_number & 0xFFFF) == 0xb2a1
    }

    /// Kuznetzov's "modified" format, with 8 more bytes in each record header
    pub fn is_modified_format(&self) -> bool {
        self.magic_number == MAGIC_MODIFIED
    }

    pub fn is_nanosecond_precision(&self) -> bool {
        self.magic_number == MAGIC_NSEC || self.magic_number == MAGIC_NSEC_SWAPPED
    }

    fn units_per_sec(&self) -> u64 {
        if self.is_nanosecond_precision() {
            1_000_000_000
        } else {
            1_000_000
        }
    }
}

/// Read the savefile global header
///
/// The magic number, read in little-endian, gives the byte order of all the
/// following fields.
pub fn parse_savefile_header(i: &[u8]) -> IResult<&[u8], SavefileHeader> {
    let (i, magic_number) = le_u32(i)?;
    let endian = match magic_number {
        MAGIC_USEC | MAGIC_NSEC | MAGIC_MODIFIED => Endianness::Little,
        MAGIC_USEC_SWAPPED | MAGIC_NSEC_SWAPPED => Endianness::Big,
        _ => return Err(nom::Err::Error(make_error(i, ErrorKind::Tag))),
    };
    let (i, version_major) = number::u16(endian)(i)?;
    let (i, version_minor) = number::u16(endian)(i)?;
    let (i, thiszone) = number::i32(endian)(i)?;
    let (i, sigfigs) = number::u32(endian)(i)?;
    let (i, snaplen) = number::u32(endian)(i)?;
    let (i, network) = number::i32(endian)(i)?;
    let header = SavefileHeader {
        magic_number,
        version_major,
        version_minor,
        thiszone,
        sigfigs,
        snaplen,
        network: Linktype(network),
    };
    Ok((i, header))
}

/// A savefile record: per-packet header and captured bytes
#[derive(Debug, PartialEq, Eq)]
pub struct SavefileRecord<'a> {
    pub ts_sec: u32,
    /// Fractional part of the timestamp (micro- or nanoseconds)
    pub ts_frac: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
}

fn parse_record_with(
    i: &[u8],
    endian: Endianness,
    extra_header: usize,
) -> IResult<&[u8], SavefileRecord> {
    let (i, ts_sec) = number::u32(endian)(i)?;
    let (i, ts_frac) = number::u32(endian)(i)?;
    let (i, caplen) = number::u32(endian)(i)?;
    let (i, origlen) = number::u32(endian)(i)?;
    let (i, _) = take(extra_header)(i)?;
    let (i, data) = take(caplen as usize)(i)?;
    let record = SavefileRecord {
        ts_sec,
        ts_frac,
        caplen,
        origlen,
        data,
    };
    Ok((i, record))
}

/// Read a record header and data (little-endian)
pub fn parse_record(i: &[u8]) -> IResult<&[u8], SavefileRecord> {
    parse_record_with(i, Endianness::Little, 0)
}

/// Read a record header and data (big-endian)
pub fn parse_record_be(i: &[u8]) -> IResult<&[u8], SavefileRecord> {
    parse_record_with(i, Endianness::Big, 0)
}

/// Read a record header and data ("modified" format: ifindex, protocol,
/// packet type and padding follow the standard fields)
pub fn parse_record_modified(i: &[u8]) -> IResult<&[u8], SavefileRecord> {
    parse_record_with(i, Endianness::Little, 8)
}

type RecordParseFn = fn(&[u8]) -> IResult<&[u8], SavefileRecord>;

/// Outcome of one parsing attempt, free of borrows on the buffer
enum Step {
    Frame(usize, RawFrame),
    Incomplete(Needed),
    Malformed,
}

/// Frame source replaying a legacy pcap savefile
///
/// This is a streaming parser based on a circular buffer: memory usage is
/// bounded and the input can be any `Read` (a file, a pipe, an in-memory
/// slice). The savefile header is read when the source is created; each
/// call to `next_frame` then returns one record. Records that do not fit in
/// the buffer make it grow, up to a fixed limit.
///
/// ## Example
///
/// ```rust,no_run
/// use packet_sniffer::error::SnifferError;
/// use packet_sniffer::source::{FrameSource, ReplaySource};
///
/// let mut source = ReplaySource::open("capture.pcap").expect("ReplaySource");
/// loop {
///     match source.next_frame() {
///         Ok(frame) => println!("{} bytes", frame.orig_len),
///         Err(SnifferError::Closed) => break,
///         Err(e) => panic!("error while reading: {}", e),
///     }
/// }
/// ```
pub struct ReplaySource<R>
where
    R: Read,
{
    header: SavefileHeader,
    reader: R,
    buffer: Buffer,
    reader_exhausted: bool,
    parse: RecordParseFn,
    frames: u64,
}

impl ReplaySource<File> {
    /// Open the savefile at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ReplaySource<File>, SnifferError> {
        let file = File::open(path.as_ref())?;
        ReplaySource::new(DEFAULT_CAPACITY, file)
    }
}

impl<R> ReplaySource<R>
where
    R: Read,
{
    /// Creates a new `ReplaySource<R>` with the provided buffer capacity,
    /// and reads the savefile header.
    pub fn new(capacity: usize, reader: R) -> Result<ReplaySource<R>, SnifferError> {
        let mut buffer = Buffer::with_capacity(capacity.max(64));
        let mut reader = reader;
        let mut reader_exhausted = false;
        let header = loop {
            match parse_savefile_header(buffer.data()) {
                Ok((_, header)) => break header,
                Err(nom::Err::Incomplete(_)) if !reader_exhausted => {
                    let sz = reader.read(buffer.space())?;
                    reader_exhausted = sz == 0;
                    buffer.fill(sz);
                }
                Err(nom::Err::Incomplete(_)) => {
                    return Err(SnifferError::InvalidCapture("truncated file header"))
                }
                Err(_) => return Err(SnifferError::InvalidCapture("file header not recognized")),
            }
        };
        buffer.consume(header.size());
        debug!(
            "savefile version {}.{}, linktype {}, snaplen {}",
            header.version_major, header.version_minor, header.network, header.snaplen
        );
        let parse: RecordParseFn = if header.is_modified_format() {
            parse_record_modified
        } else if header.is_bigendian() {
            parse_record_be
        } else {
            parse_record
        };
        Ok(ReplaySource {
            header,
            reader,
            buffer,
            reader_exhausted,
            parse,
            frames: 0,
        })
    }

    pub fn header(&self) -> &SavefileHeader {
        &self.header
    }

    /// Number of frames returned so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn step(&self) -> Step {
        let data = self.buffer.data();
        match (self.parse)(data) {
            Ok((rem, rec)) => {
                let frame = RawFrame::from_pcap_ts(
                    i64::from(rec.ts_sec),
                    rec.ts_frac,
                    self.header.units_per_sec(),
                    rec.data.to_vec(),
                    rec.origlen,
                    self.header.network,
                );
                Step::Frame(data.offset(rem), frame)
            }
            Err(nom::Err::Incomplete(needed)) => Step::Incomplete(needed),
            Err(_) => Step::Malformed,
        }
    }

    fn refill(&mut self) -> Result<(), SnifferError> {
        self.buffer.shift();
        let space = self.buffer.space();
        // check if available space is empty, so we can distinguish
        // a read() returning 0 because of EOF or because we requested 0
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space)?;
        self.reader_exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }

    /// Make sure `needed` more bytes fit in the buffer
    fn reserve(&mut self, needed: usize) -> Result<(), SnifferError> {
        let wanted = self.buffer.available_data() + needed;
        if wanted <= self.buffer.capacity() {
            return Ok(());
        }
        let new_size = wanted.next_power_of_two();
        if new_size > MAX_CAPACITY || !self.buffer.grow(new_size) {
            return Err(SnifferError::InvalidCapture("record larger than read buffer"));
        }
        trace!("read buffer grown to {} bytes", new_size);
        Ok(())
    }
}

impl<R> FrameSource for ReplaySource<R>
where
    R: Read,
{
    fn next_frame(&mut self) -> Result<RawFrame, SnifferError> {
        loop {
            // all bytes have been read, and no more data is available
            if self.buffer.available_data() == 0 && self.reader_exhausted {
                return Err(SnifferError::Closed);
            }
            match self.step() {
                Step::Frame(offset, frame) => {
                    self.buffer.consume(offset);
                    self.frames += 1;
                    return Ok(frame);
                }
                Step::Incomplete(_) if self.reader_exhausted => {
                    // expected more bytes but reader is EOF
                    return Err(SnifferError::InvalidCapture("truncated record"));
                }
                Step::Incomplete(needed) => {
                    if let Needed::Size(n) = needed {
                        self.reserve(n.get())?;
                    }
                    self.refill()?;
                }
                Step::Malformed => return Err(SnifferError::InvalidCapture("malformed record")),
            }
        }
    }

    fn linktype(&self) -> Linktype {
        self.header.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const HEADER_LE: [u8; 24] = hex!("d4c3b2a1 0200 0400 00000000 00000000 ffff0000 01000000");
    const HEADER_BE_NSEC: [u8; 24] = hex!("a1b23c4d 0002 0004 00000000 00000000 0000ffff 00000001");
    // ts 1340954905.298858, caplen 14, origlen 60
    const RECORD_LE: [u8; 30] = hex!(
        "19 59 ed 4f 6a 8f 04 00 0e 00 00 00 3c 00 00 00
         ffffffffffff 000102030405 0806"
    );

    #[test]
    fn parse_header_le() {
        let (rem, hdr) = parse_savefile_header(&HEADER_LE).expect("header");
        assert!(rem.is_empty());
        assert_eq!(hdr.version_major, 2);
        assert_eq!(hdr.version_minor, 4);
        assert_eq!(hdr.snaplen, 65535);
        assert_eq!(hdr.network, Linktype::ETHERNET);
        assert!(!hdr.is_bigendian());
        assert!(!hdr.is_nanosecond_precision());
    }

    #[test]
    fn parse_header_be() {
        let (_, hdr) = parse_savefile_header(&HEADER_BE_NSEC).expect("header");
        assert!(hdr.is_bigendian());
        assert!(hdr.is_nanosecond_precision());
        assert_eq!(hdr.network, Linktype::ETHERNET);
    }

    #[test]
    fn replay_one_record() {
        let mut input = HEADER_LE.to_vec();
        input.extend_from_slice(&RECORD_LE);
        let mut source = ReplaySource::new(1024, &input[..]).expect("ReplaySource");
        assert_eq!(source.linktype(), Linktype::ETHERNET);
        let frame = source.next_frame().expect("frame");
        assert_eq!(frame.data.len(), 14);
        assert_eq!(frame.orig_len, 60);
        assert_eq!(frame.ts.timestamp(), 1340954905);
        assert_eq!(frame.ts.timestamp_subsec_micros(), 298858);
        assert!(matches!(source.next_frame(), Err(SnifferError::Closed)));
        assert_eq!(source.frames(), 1);
    }

    #[test]
    fn parse_record_big_endian() {
        const RECORD_BE: [u8; 18] = hex!("4fed5919 0000 0001 00000002 0000003c ffff");
        let (rem, rec) = parse_record_be(&RECORD_BE).expect("record");
        assert!(rem.is_empty());
        assert_eq!(rec.ts_sec, 1340954905);
        assert_eq!(rec.ts_frac, 1);
        assert_eq!(rec.caplen, 2);
        assert_eq!(rec.origlen, 60);
        assert_eq!(rec.data, &hex!("ffff"));
    }

    #[test]
    fn small_buffer_grows() {
        let mut input = HEADER_LE.to_vec();
        for n in 0..10u8 {
            // ts, caplen 200, origlen 200, payload
            input.extend_from_slice(&hex!("00000000 00000000 c8000000 c8000000"));
            input.extend_from_slice(&[n; 200]);
        }
        let mut source = ReplaySource::new(64, &input[..]).expect("ReplaySource");
        let mut count = 0;
        loop {
            match source.next_frame() {
                Ok(frame) => {
                    assert_eq!(frame.data, vec![count; 200]);
                    count += 1;
                }
                Err(SnifferError::Closed) => break,
                Err(e) => panic!("error while reading: {}", e),
            }
        }
        assert_eq!(count, 10);
    }

    #[test]
    fn truncated_record() {
        let mut input = HEADER_LE.to_vec();
        input.extend_from_slice(&RECORD_LE[..25]);
        let mut source = ReplaySource::new(1024, &input[..]).expect("ReplaySource");
        assert!(matches!(
            source.next_frame(),
            Err(SnifferError::InvalidCapture("truncated record"))
        ));
    }

    #[test]
    fn bad_headers() {
        let empty: &[u8] = &[];
        assert!(matches!(
            ReplaySource::new(1024, empty),
            Err(SnifferError::InvalidCapture(_))
        ));
        let garbage: &[u8] = &[0u8; 24];
        assert!(matches!(
            ReplaySource::new(1024, garbage),
            Err(SnifferError::InvalidCapture("file header not recognized"))
        ));
    }
}
