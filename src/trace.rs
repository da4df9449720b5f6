//! Chrome trace output.
//!
//! Scope timings around cache lookup and resolution, for loading into
//! chrome://tracing or speedscope.  Off until `open` is called.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::Instant;

// Scopes can be entered from any thread, so the trace state is a mutex
// rather than a thread-local.
static TRACE: Mutex<Option<Trace>> = Mutex::new(None);

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_complete(&mut self, name: &str, start: Instant, end: Instant) -> std::io::Result<()> {
        writeln!(
            self.w,
            "{{ \"pid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }},",
            name,
            start.duration_since(self.start).as_micros(),
            end.duration_since(start).as_micros(),
        )
    }

    fn close(&mut self) -> std::io::Result<()> {
        let start = self.start;
        self.write_complete("main", start, Instant::now())?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

/// Start tracing to the given path.
pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    *TRACE.lock().unwrap() = Some(trace);
    Ok(())
}

/// Time `f` and record it as a complete span if tracing is on.
#[inline]
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    let end = Instant::now();
    if let Some(trace) = TRACE.lock().unwrap().as_mut() {
        let _ = trace.write_complete(name, start, end);
    }
    result
}

/// Finish and flush the trace file, if tracing is on.
pub fn close() -> std::io::Result<()> {
    if let Some(trace) = TRACE.lock().unwrap().as_mut() {
        return trace.close();
    }
    Ok(())
}
