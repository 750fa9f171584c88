//! Container lifecycle management for the minibox runtime.
//!
//! The [`engine::Engine`] owns the Created → Running → Stopped → Deleted
//! state machine (with Paused reachable from Running) and sequences the
//! isolation primitives from `minibox-core`. Container records persist via
//! [`registry::Registry`] so a new invocation can rediscover them.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod engine;
pub mod exec;
pub mod metrics;
pub mod registry;
