pub mod cmdline;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod lists;
pub mod printer;
pub mod reader;
pub mod special_forms;
pub mod strings;
pub mod tokens;
pub mod types;

#[macro_use]
extern crate lazy_static;

mod builtins;

pub use interpreter::{Config, Interpreter};
pub use types::Value;
