pub mod error;
pub mod executor;
pub mod parser;
pub mod retry;
