//! Outbound HTTP plumbing shared by the channel senders.

pub mod client;
