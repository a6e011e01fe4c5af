//! Structured logging setup (C12, ambient).
//!
//! A minimal `slog::Drain` (`MsgLogger`) wraps an arbitrary `io::Write` and
//! timestamps `Trace`-level records with elapsed nanoseconds, giving a flat
//! CSV-ish trace good for post-hoc analysis of per-event dispatch when
//! `--logfile` is given. The usual `slog_term`/`slog_async` composition
//! handles the interactive terminal case.

use slog::Drain;
use std::cell::RefCell;
use std::io;
use std::time::Instant;

/// A minimal `slog::Drain` that writes one line per record. `Trace`-level
/// records are prefixed with elapsed nanoseconds since the logger was
/// built, so a `--logfile` run produces a simple `time,message` trace.
pub struct MsgLogger<W: io::Write> {
    io: RefCell<W>,
    start: Instant,
}

impl<W: io::Write> MsgLogger<W> {
    /// Wraps `io` as a drain, starting its elapsed-time clock now.
    pub fn new(io: W) -> MsgLogger<W> {
        MsgLogger {
            io: RefCell::new(io),
            start: Instant::now(),
        }
    }
}

impl<W: io::Write> Drain for MsgLogger<W> {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &slog::Record, _values: &slog::OwnedKVList) -> io::Result<()> {
        let mut io = self.io.borrow_mut();
        if record.level() == slog::Level::Trace {
            writeln!(io, "{},{}", self.start.elapsed().as_nanos(), record.msg())?;
        } else {
            writeln!(io, "{}", record.msg())?;
        }
        Ok(())
    }
}

/// Builds the root logger for a run.
///
/// With no `logfile`, logs go to an asynchronous, human-readable terminal
/// drain (`slog_term` + `slog_async`). With `logfile`, logs go to
/// [`MsgLogger`] over the opened file so the flat trace format survives for
/// offline analysis. `max_level` gates what actually reaches the drain
/// (`verbose` maps to `slog::Level::Trace`, otherwise `slog::Level::Info`).
pub fn build_root_logger(
    logfile: Option<&std::path::Path>,
    max_level: slog::Level,
) -> io::Result<slog::Logger> {
    let drain: Box<dyn Drain<Ok = (), Err = slog::Never> + Send> = match logfile {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let msg_drain = MsgLogger::new(file).fuse();
            Box::new(slog_async::Async::new(msg_drain).build().fuse())
        }
        None => {
            let decorator = slog_term::TermDecorator::new().build();
            let term_drain = slog_term::FullFormat::new(decorator).build().fuse();
            Box::new(slog_async::Async::new(term_drain).build().fuse())
        }
    };

    let filtered = drain.filter_level(max_level).fuse();
    Ok(slog::Logger::root(filtered, slog::o!()))
}
