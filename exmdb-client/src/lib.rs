//! # exmdb-client
//!
//! Client library for the exmdb message store RPC.
//!
//! This crate provides:
//! - TCP client with connect/reconnect management and response dispatch
//! - High-level administrative queries (folder listing, permission editing,
//!   device synchronization state)
//!
//! The protocol has no request multiplexing: every call is a strict
//! request/response exchange on the single connection. The client exposes
//! this through `&mut self` methods, so a client cannot be shared between
//! tasks; callers wanting concurrency open one client per connection.

pub mod client;
pub mod connection;
pub mod error;
pub mod queries;

#[cfg(test)]
mod testing;

pub use client::{ClientFlags, ExmdbClient};
pub use connection::Connection;
pub use error::ClientError;
pub use queries::{
    ExmdbQueries, Folder, FolderList, FolderMember, FolderMemberList, PermissionMode,
};
