//! Delayed SHA-512 hashing server with drain-based shutdown.
//!
//! Clients `POST /hash` a `password` form field and, after an artificial
//! five to six second delay, receive its SHA-512 digest in base-64.
//! `GET /stats` reports how many hashes were produced and their folding
//! average latency. `/shutdown` stops admitting work, lets every in-flight
//! request finish, and then closes the listener.
//!
//! - [`digest`] holds the pure SHA-512 and base-64 functions.
//! - [`stats`] aggregates request count and latency under a read/write lock.
//! - [`tracker`] counts in-flight work with drop guards and waits for drain.
//! - [`state`] owns the accepting/draining/stopped state and atomic admission.
//! - [`app`] bundles those pieces into the state injected into handlers.
//! - [`handlers`] maps routes to the hashing, stats and shutdown handlers.
//! - [`server`] owns the listener and runs the shutdown sequence.
//! - [`cli`] and [`config`] turn command-line flags into [`config::Settings`].

pub mod app;
pub mod cli;
pub mod config;
pub mod digest;
pub mod handlers;
pub mod server;
pub mod state;
pub mod stats;
pub mod tracker;
