//! Run the intern and hash commands
//!
//! Strings given on the command line are interned by copy, lines read
//! from files by transfer, and a report of canonical handles is
//! written out before the runtime is torn down.

use std::{fs, io::Write, path::Path, time::Instant};

use serde_json::json;

use crate::{
    driver::{
        error::LoxHeapError,
        options::{LoxHeapOptions, Mode},
        statistics::Statistics,
    },
    eval::{
        memory::{hash::hash_bytes, string::StrRef},
        runtime::Runtime,
    },
};

/// One interned input and the canonical string it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternRecord {
    /// Where the input came from (`arg` or `path:line`)
    pub source: String,
    pub handle: StrRef,
    pub hash: u32,
    pub length: usize,
    pub content: String,
    /// Whether this input created the canonical string
    pub created: bool,
}

/// Execute the selected command, writing the report to `out`
pub fn run<W: Write>(opt: &LoxHeapOptions, out: &mut W) -> Result<Statistics, LoxHeapError> {
    let mut stats = Statistics::default();
    match opt.mode() {
        Mode::Hash => hash(opt, out)?,
        Mode::Intern => intern(opt, out, &mut stats)?,
        Mode::Explain => write!(out, "{}", opt.explanation())?,
    }
    Ok(stats)
}

/// Print the FNV-1a hash of each string
fn hash<W: Write>(opt: &LoxHeapOptions, out: &mut W) -> Result<(), LoxHeapError> {
    for s in opt.strings() {
        writeln!(out, "{:08x} {}", hash_bytes(s.as_bytes()), s)?;
    }
    Ok(())
}

fn intern<W: Write>(
    opt: &LoxHeapOptions,
    out: &mut W,
    stats: &mut Statistics,
) -> Result<(), LoxHeapError> {
    let mut runtime = Runtime::with_settings(opt.heap_settings());
    let mut records = vec![];

    let t = Instant::now();
    for s in opt.strings() {
        let misses = runtime.strings().stats().misses;
        let handle = runtime.intern_by_copy(s.as_bytes())?;
        let created = runtime.strings().stats().misses > misses;
        records.push(record(&runtime, "arg".to_string(), handle, created)?);
    }
    stats.timings_mut().record("intern-args", t.elapsed());

    let t = Instant::now();
    for path in opt.files() {
        for (n, line) in read_lines(path)?.into_iter().enumerate() {
            let misses = runtime.strings().stats().misses;
            let handle = runtime.intern_by_transfer(line)?;
            let created = runtime.strings().stats().misses > misses;
            let source = format!("{}:{}", path.display(), n + 1);
            records.push(record(&runtime, source, handle, created)?);
        }
    }
    stats.timings_mut().record("intern-files", t.elapsed());

    let t = Instant::now();
    if opt.json() {
        write_json(out, &records)?;
    } else {
        write_text(out, &records)?;
    }
    stats.timings_mut().record("report", t.elapsed());

    let t = Instant::now();
    runtime.teardown();
    stats.timings_mut().record("teardown", t.elapsed());

    stats.set_runtime(runtime.stats());
    Ok(())
}

fn record(
    runtime: &Runtime,
    source: String,
    handle: StrRef,
    created: bool,
) -> Result<InternRecord, LoxHeapError> {
    let s = runtime.string(handle)?;
    Ok(InternRecord {
        source,
        handle,
        hash: s.hash(),
        length: s.len(),
        content: s.to_string_lossy().into_owned(),
        created,
    })
}

/// Read a file as lines of bytes, without terminators
fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>, LoxHeapError> {
    let bytes = fs::read(path)
        .map_err(|_| LoxHeapError::FileCouldNotBeRead(path.display().to_string()))?;
    if bytes.is_empty() {
        return Ok(vec![]);
    }

    let body = bytes.strip_suffix(b"\n").unwrap_or(&bytes[..]);
    Ok(body
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect())
}

fn write_text<W: Write>(out: &mut W, records: &[InternRecord]) -> Result<(), LoxHeapError> {
    for r in records {
        writeln!(
            out,
            "{:<10} {:08x} {}{}",
            r.handle.to_string(),
            r.hash,
            r.content,
            if r.created { "" } else { " (interned)" }
        )?;
    }
    Ok(())
}

fn write_json<W: Write>(out: &mut W, records: &[InternRecord]) -> Result<(), LoxHeapError> {
    let report: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "source": r.source,
                "handle": r.handle.to_string(),
                "hash": r.hash,
                "length": r.length,
                "content": r.content,
                "created": r.created,
            })
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}
