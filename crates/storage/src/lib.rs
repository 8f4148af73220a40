#![warn(clippy::pedantic)]

pub mod memory;

pub use memory::InMemoryStore;

#[cfg(test)]
mod tests;
