pub mod character;
pub mod chat;
pub mod settings;

pub use character::*;
pub use chat::*;
pub use settings::*;
