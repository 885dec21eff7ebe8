pub mod gate;

pub use gate::SyncGate;
