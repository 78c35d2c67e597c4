pub mod agent;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod search;
pub mod session;
pub mod streaming;
pub mod tools;
