//! Trace file I/O.
//!
//! Trace lines are whitespace-separated, not comma-separated, so the
//! `csv` crate is configured with `delimiter(b' ').flexible(true)` rather
//! than hand-rolling a `split_whitespace` parser.
//!
//! Local trace files are discovered and opened eagerly by the controller
//! before the run loop starts (one failed `open` there is a startup
//! error, not a mid-run surprise); records are then read one at a time
//! in file order as each router's turn comes up in the main trace.

use std::fs::File;
use std::io;
use std::path::Path;

use noc_router::Addr;

/// One `(t, src, dst, packet_size)` record from a trace file.
#[derive(Debug, Clone, Copy)]
pub struct TraceRecord {
    pub time: f64,
    pub src: Addr,
    pub dst: Addr,
    pub packet_size: usize,
}

/// A trace file reader that yields records lazily in file order (main
/// trace) or file order (already time-sorted, for local traces).
#[derive(Debug)]
pub struct TraceReader {
    reader: csv::Reader<File>,
}

impl TraceReader {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<TraceReader> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            io::Error::new(e.kind(), format!("cannot open trace file {}: {}", path.display(), e))
        })?;
        let reader = csv::ReaderBuilder::new()
            .delimiter(b' ')
            .flexible(true)
            .has_headers(false)
            .from_reader(file);
        Ok(TraceReader { reader })
    }

    /// Reads the next record, or `None` at EOF ("Trace EOF: terminates
    /// injection for that router silently").
    pub fn next_record(&mut self) -> io::Result<Option<TraceRecord>> {
        let mut record = csv::StringRecord::new();
        loop {
            let more = self
                .reader
                .read_record(&mut record)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            if !more {
                return Ok(None);
            }
            let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 6 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("malformed trace line (expected 6 fields, got {}): {:?}", fields.len(), fields),
                ));
            }
            let parse = |s: &str| -> io::Result<u16> {
                s.parse().map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("bad integer: {}", s)))
            };
            let time: f64 = fields[0]
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("bad timestamp: {}", fields[0])))?;
            let src = Addr::new(parse(fields[1])?, parse(fields[2])?);
            let dst = Addr::new(parse(fields[3])?, parse(fields[4])?);
            let packet_size: usize = fields[5]
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("bad packet_size: {}", fields[5])))?;
            return Ok(Some(TraceRecord { time, src, dst, packet_size }));
        }
    }
}

/// Path to router `(x, y)`'s local trace file, `<main>.x.y`.
pub fn local_trace_path(main: &str, addr: Addr) -> String {
    format!("{}.{}.{}", main, addr.x, addr.y)
}
