pub mod consolidation;
pub mod levels;
pub mod reason;
