pub mod blocks;
pub mod bridge;
pub mod codec;
pub mod comms;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod poller;
pub mod profile;
pub mod status;
pub mod thing;
pub mod transport;
pub mod units;
pub mod writer;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
