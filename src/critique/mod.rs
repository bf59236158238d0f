pub mod parser;
pub mod score;
pub mod sections;
