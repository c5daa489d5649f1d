pub mod alerts;
pub mod applier;
pub mod pipeline;
pub mod refunds;
pub mod retry;
