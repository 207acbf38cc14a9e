pub mod python;
pub mod sandbox;
pub mod scratch;
pub mod script;
#[cfg(test)]
pub mod stubs;
pub mod traits;

pub use traits::{Backend, ExecuteError, LoadError};
