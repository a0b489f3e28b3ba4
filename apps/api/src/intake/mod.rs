pub mod form;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod repository;
pub mod resume;
pub mod storage;
