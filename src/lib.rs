pub mod annotation;
pub mod batch;
pub mod config;
pub mod domain;
pub mod error;
pub mod expression;
pub mod lookup;
pub mod retry;
pub mod session;
pub mod table;
