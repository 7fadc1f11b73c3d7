//! Domain entities for the display manager.
//!
//! This module contains pure data and rules with no infrastructure
//! dependencies: no locks, no async, no OS calls.  The application layer in
//! `dms-server` owns instances of these types and serialises access to them.
//!
//! # What is "domain" here? (for beginners)
//!
//! The domain layer names the things the service is about (screens, screen
//! groups, displays, pointer samples, rectangles) and the failure kinds its
//! operations can produce.  Everything here can be unit-tested without any
//! setup, and outer layers depend on it but never the reverse.

pub mod display;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod pointer;
pub mod screen;
