// MIT License - Copyright (c) 2026 Peter Wright
// Message sinks

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Cloneable, thread-safe handle to a single writer.
///
/// Used for the application log file, which is written both by the
/// `tracing` subscriber and by reporter diagnostics.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// A writer that discards everything.
    pub fn discard() -> Self {
        Self::new(io::sink())
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut w = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("writer lock poisoned"))?;
        w.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut w = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("writer lock poisoned"))?;
        w.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Duplicates every write to all of its sinks.
///
/// Each sink receives the whole buffer. A failing sink does not prevent the
/// others from being written; the first error is returned afterwards.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Write + Send + 'static) -> Self {
        self.push(sink);
        self
    }

    pub fn push(&mut self, sink: impl Write + Send + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Write for Fanout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.write_all(buf) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
