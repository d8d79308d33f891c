pub mod execution;
pub mod text;
pub mod time;
