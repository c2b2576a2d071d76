pub mod generator;
pub mod input;
pub mod llm;
pub mod story;
