pub mod config;
pub mod context_store;
pub mod controller;
pub mod delivery;
pub mod identity;
pub mod shaper;
pub mod storage;
