//! `rackled` drives the addressable LED strips lining a server rack.
//!
//! Positions are given as rack sides, rack units ("U") or equipment names,
//! mapped onto the flat pixel array of a single LED controller and sent to it
//! as JSON segment patches.

#[macro_use]
extern crate tracing;

pub mod catalog;
pub mod color;
pub mod commands;
pub mod device;
pub mod geometry;
pub mod global;
pub mod models;
pub mod patch;
pub mod serde;
pub mod store;
pub mod tasks;
pub mod web;
