// Configuration loading

pub mod settings;

pub use settings::{RateSettings, Settings};
