pub mod context;

pub use context::{SpawnedApp, TestContext};

pub mod keys;
