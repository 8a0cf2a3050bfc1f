//! Allocation and memory management for the machine
pub mod hash;
pub mod header;
pub mod heap;
pub mod intern;
pub mod object;
pub mod string;
