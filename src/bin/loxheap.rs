extern crate lox_heap;

use std::io::{self, Write};
use std::process;

use lox_heap::driver::intern;
use lox_heap::driver::options::LoxHeapOptions;
use lox_heap::driver::statistics::Statistics;

pub fn main() {
    let opt = LoxHeapOptions::from_args();

    // For a dry run, just explain the options
    if opt.explain() {
        println!("{}", opt.explanation());
        process::exit(0);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = intern::run(&opt, &mut out).and_then(|stats| {
        out.flush()?;
        Ok(stats)
    });

    match result {
        Ok(stats) => exit(&opt, 0, &stats),
        Err(e) => {
            eprintln!("{e}");
            exit(&opt, 1, &Statistics::default())
        }
    }
}

/// Optionally dump stats to stderr then exit
pub fn exit(opts: &LoxHeapOptions, code: i32, stats: &Statistics) {
    if opts.statistics() {
        eprintln!();
        eprintln!("~~~~~~~~~~");
        eprintln!("STATISTICS");
        eprintln!("~~~~~~~~~~");
        eprintln!();
        eprintln!("{stats}");
    }
    process::exit(code)
}
