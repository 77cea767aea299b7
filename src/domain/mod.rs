//! Billing domain: money primitives, sessions, payment cycles and the ports
//! the application layer talks to storage through.

pub mod connection;
pub mod cycle;
pub mod ids;
pub mod money;
pub mod ports;
pub mod session;
pub mod teacher;
