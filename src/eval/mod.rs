pub mod error;
pub mod memory;
pub mod runtime;
pub mod value;
