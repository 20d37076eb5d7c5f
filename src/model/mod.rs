//! Core data model types: attachment candidates, per-part outcomes, run totals.

pub mod attachment;
pub mod outcome;
