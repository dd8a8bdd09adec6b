pub mod domain;
pub mod filter;
pub mod identity;
pub mod ratelimit;
pub mod text;
