//! Library side of the `strand` binary: task plans and pattern commands.

pub mod plan;
pub mod search;
