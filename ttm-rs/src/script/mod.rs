//! The TTM language.
//!
//! This module implements the scanning evaluator and everything it
//! operates on:
//!
//! - `#<name;arg;...>` active and `##<name;arg;...>` passive calls
//! - `<...>` literal spans, nesting allowed
//! - Macros with segment marks (`ss`) and creation marks (`cr`)
//! - Residual-cursor scanning of macro bodies (`cc`, `cn`, `cp`, `scn`, ...)
//! - Character classes (`dcl`, `ccl`, `tcl`, ...)
//! - Roughly sixty builtins, see [`builtins`]
//!
//! # Quick start
//!
//! ```rust
//! use ttm::console::MemoryConsole;
//! use ttm::script::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! interp.set_console(Box::new(MemoryConsole::new()));
//! let out = interp
//!     .eval("#<ds;greet;<Hello, who!>>#<ss;greet;who>#<greet;World>")
//!     .unwrap();
//! assert_eq!(out, "Hello, World!");
//! ```

pub mod buffer;
pub mod builtins;
pub mod charclass;
pub mod dict;
pub mod expand;
pub mod frame;
pub mod interp;
pub mod number;
pub mod syntax;

// Re-exports for convenience.
pub use builtins::{lookup_builtin, Builtin, BuiltinOp, Effect};
pub use dict::{EntryKind, NameEntry};
pub use interp::Interpreter;
pub use syntax::Syntax;
