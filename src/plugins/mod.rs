//! Datastore operations exposed on the command line.

pub mod bootstrap;
pub mod import;
