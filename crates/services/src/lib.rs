pub mod extraction;
pub mod history;
pub mod kv;
pub mod references;
pub mod settings;
