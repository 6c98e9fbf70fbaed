//! Process-level helpers for hosts of the anchor system.

pub mod bootstrap;
