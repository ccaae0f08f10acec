pub mod env;
pub mod settings;

pub use env::Env;
pub use settings::Settings;
