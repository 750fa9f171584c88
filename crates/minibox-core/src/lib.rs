//! # minibox-core
//!
//! Low-level Linux isolation primitives for the minibox runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: PID, Mount, UTS, IPC, cgroup, and optional network and
//!   user namespace creation via `clone(2)`, plus `setns(2)` entry.
//! - **Cgroups v2**: CPU, memory, and PID accounting and limiting via the
//!   unified hierarchy.
//! - **Filesystem**: `pivot_root` jailing and essential pseudo-filesystem
//!   mounts.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! proper error handling and `// SAFETY:` documentation.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
