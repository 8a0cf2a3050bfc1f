//! Capture and report statistics for optimisation

use std::{fmt::Display, time::Duration};

use indexmap::IndexMap;

use crate::eval::runtime::RuntimeStats;

#[derive(Default, Debug)]
pub struct Timings {
    timings: IndexMap<String, Duration>,
}

impl Timings {
    pub fn record<T: AsRef<str>>(&mut self, name: T, elapsed: Duration) {
        self.timings.insert(name.as_ref().to_string(), elapsed);
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<Duration> {
        self.timings.get(name.as_ref()).copied()
    }
}

impl Display for Timings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.timings.keys().map(|k| k.len()).max().unwrap_or(0) + 1;

        for (k, v) in &self.timings {
            writeln!(f, "{:width$}: {:14.9}s", k, v.as_secs_f64(), width = width)?;
        }
        Ok(())
    }
}

/// The statistics captured during a run
#[derive(Default, Debug)]
pub struct Statistics {
    runtime: RuntimeStats,
    timings: Timings,
}

impl Statistics {
    pub fn set_runtime(&mut self, runtime: RuntimeStats) {
        self.runtime = runtime;
    }

    pub fn runtime(&self) -> &RuntimeStats {
        &self.runtime
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn timings_mut(&mut self) -> &mut Timings {
        &mut self.timings
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strings = &self.runtime.strings;
        write!(f, "{}", self.runtime.heap)?;
        writeln!(f, "Interned          : {:10}", self.runtime.interned)?;
        writeln!(f, "Intern Hits       : {:10}", strings.hits)?;
        writeln!(f, "Intern Misses     : {:10}", strings.misses)?;
        writeln!(f, "Transfers Dropped : {:10}", strings.transfers_released)?;
        writeln!(f, "Entries Purged    : {:10}", strings.purged)?;
        writeln!(f)?;
        writeln!(f, "{}", self.timings)
    }
}
