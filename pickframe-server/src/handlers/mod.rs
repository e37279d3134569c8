pub mod health;
pub mod random;
