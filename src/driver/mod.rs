//! Command line driver
pub mod error;
pub mod intern;
pub mod options;
pub mod statistics;
