//! Policy store implementations

pub mod memory;

pub use memory::MemoryPolicyStore;
