pub mod chars;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod render;
pub mod script;

pub use error::{ErrorKind, TtmError};
pub use script::Interpreter;
