//! Post content engine for a personal publishing site.
//!
//! Layers follow the usual split: `domain` holds pure types and algorithms,
//! `application` wires them into request-scoped services over repository
//! traits, and `infra` provides the Postgres and in-process adapters plus
//! process bootstrap (telemetry, errors).

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
