pub mod dev;
pub mod events;
pub mod health;
