//! Types shared between the student API client and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
