// Plain data records exchanged between pipeline stages.
// Every value here is created fresh per run; nothing is persisted.

pub mod analysis;
pub mod report;
pub mod requirements;
pub mod resume;
