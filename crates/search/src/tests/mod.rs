//! Engine-level tests running the builder and orchestrator against
//! in-memory store and generator doubles.

mod orchestrator;
mod support;
