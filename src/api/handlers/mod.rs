pub mod cycle;
pub mod events;
pub mod health;
pub mod metrics;
