//! Orchestration of one discovery run and the output model.

pub mod discovered_item;
pub mod discoverer;
pub mod properties;
pub mod property_mapper;

pub use discovered_item::{DiscoveredItem, Replacement};
pub use discoverer::Discoverer;
