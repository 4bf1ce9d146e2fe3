pub mod lox;
pub mod scanner;
pub mod token;

pub use crate::lox::Lox;
