//! Repository implementations.

mod memory;

pub use memory::MemoryRepository;
