// Persisted reviews: one row per (employee, cycle), workflow status and history.
// The synthesis endpoint never touches storage; callers save results here.

pub mod handlers;
pub mod lifecycle;
pub mod store;
