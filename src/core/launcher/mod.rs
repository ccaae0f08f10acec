pub mod lock;
pub mod profile;

pub use profile::{upsert_profile, ProfileSpec};
