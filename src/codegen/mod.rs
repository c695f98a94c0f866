mod code_buffer;
pub mod runtime;

pub use code_buffer::*;
