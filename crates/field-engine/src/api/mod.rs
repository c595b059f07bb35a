pub mod board;
pub mod types;
