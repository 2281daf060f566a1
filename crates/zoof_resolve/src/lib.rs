//! Static scope resolution: walks a parsed `Program` once, assigning every
//! variable reference the lexical depth the interpreter will use to find
//! its environment directly instead of searching by name at run time.

pub mod error;
pub mod resolver;

pub use error::Error;
pub use resolver::{resolve, resolve_repl_line, Resolver};
