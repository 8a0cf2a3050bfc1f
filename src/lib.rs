extern crate bitmaps;
extern crate clap;
extern crate indexmap;
extern crate serde_json;
extern crate thiserror;

pub mod driver;
pub mod eval;
