//! The core module holds the settings, error type and collaborator contracts shared by everything else.

pub mod app_info;
pub mod error;
pub mod fence_value;
pub mod queue;
