pub mod sessions;
pub mod ws;
