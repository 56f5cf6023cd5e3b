//! Shared test doubles and behaviour scenarios for the queue crate.

pub(crate) mod support;
