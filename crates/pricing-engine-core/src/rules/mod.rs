//! Reference data consumed by the resolver and the engine.
//!
//! Three tables, each addressed by a single natural key:
//! classification code, (origin, destination) route, channel name.
//! The engine only depends on [`RuleStore`]; [`RuleBook`] is the in-memory
//! implementation.

pub mod book;
pub mod model;
#[cfg(feature = "seed")]
pub mod seed;

pub use book::{RuleBook, RuleBookData};
pub use model::*;

/// Read-only lookups over the three rule tables.
///
/// Absent records are `None`; each caller decides the fallback.
pub trait RuleStore {
    fn get_classification(&self, code: &str) -> Option<ClassificationRule>;

    fn get_route(&self, origin: &str, destination: &str) -> Option<RouteRule>;

    fn get_channel(&self, name: &str) -> Option<ChannelSchedule>;
}

impl<S: RuleStore + ?Sized> RuleStore for &S {
    fn get_classification(&self, code: &str) -> Option<ClassificationRule> {
        (**self).get_classification(code)
    }

    fn get_route(&self, origin: &str, destination: &str) -> Option<RouteRule> {
        (**self).get_route(origin, destination)
    }

    fn get_channel(&self, name: &str) -> Option<ChannelSchedule> {
        (**self).get_channel(name)
    }
}
