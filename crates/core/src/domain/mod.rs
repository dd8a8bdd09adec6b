pub mod comment;
pub mod state;
