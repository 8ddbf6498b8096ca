//! Queue module: builds ordered task queues from candidate sets.

mod builder;

pub use builder::QueueBuilder;
