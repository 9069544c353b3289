pub mod json;
pub mod markdown;
pub mod outputs;
pub mod terminal;
