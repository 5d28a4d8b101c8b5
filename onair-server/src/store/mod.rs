mod in_memory;
mod stream_store;

pub use in_memory::*;
pub use stream_store::*;
