//! Integration tests for AudioTrigger
//!
//! Everything here runs real sockets on the loopback interface.

#[cfg(test)]
mod support;

#[cfg(test)]
mod delivery_integration;

#[cfg(test)]
mod relay_integration;
