//! Binary emission scaffolding: operand descriptors and the instruction
//! buffer.

pub mod addr;
pub mod prog;

pub use addr::{Addr, Width};
pub use prog::{BranchHandle, InstBuffer, Prog};
