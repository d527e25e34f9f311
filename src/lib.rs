// src/lib.rs — Library root for datascribe

pub mod cli;
pub mod dataset;
pub mod infra;
pub mod pipeline;
pub mod provider;
pub mod sandbox;
pub mod util;
pub mod viz;
