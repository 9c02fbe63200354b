pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pool;
pub mod session;
pub mod symbol;
pub mod value;
pub mod vm;

pub use error::{Error, ErrorKind};
pub use session::{Evaluated, Session};
pub use value::Value;
