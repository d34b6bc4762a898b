//! Application layer: update strategies, services and use cases

pub mod build_listener;
pub mod services;
pub mod updaters;
pub mod use_cases;
