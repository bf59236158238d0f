pub mod agent;
pub mod prompt;
