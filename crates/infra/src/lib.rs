pub mod chatbot;
pub mod reddit;
pub mod store;
