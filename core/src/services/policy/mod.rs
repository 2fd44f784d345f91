//! Policy tuple management on top of the external policy engine

mod manager;

#[cfg(test)]
mod tests;

pub use manager::PolicyManager;
