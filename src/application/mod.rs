//! Application layer (use-cases).
//!
//! Orchestrates the Tool Host's operations from the client side without
//! depending on a particular transport.

pub mod agent;
