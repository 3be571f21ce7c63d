pub mod channel;
pub mod health;
pub mod search;
