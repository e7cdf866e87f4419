pub mod breakdown;
pub mod engine;
pub mod solver;

pub use engine::{calculate_price, ChannelSelection, PricingOutcome, PricingRequest};
