//! In-memory store and mock collaborators for tests.

mod memory;
mod mocks;

pub use {
    memory::MemoryStore,
    mocks::{MockRefundGateway, RecordingNotifier},
};
