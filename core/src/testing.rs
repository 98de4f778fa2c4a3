pub mod compiler;
pub mod diff;
pub mod error;
#[cfg(test)]
pub(crate) mod fixture;
pub mod natsort;
pub mod result;
pub mod runner;
pub mod testcase;

pub use compiler::*;
pub use diff::{align, split_lines, Edit, EditOp, EditScript};
pub use error::{Error, Result};
pub use result::*;
pub use runner::*;
pub use testcase::*;
