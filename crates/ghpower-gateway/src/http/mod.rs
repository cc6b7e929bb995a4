pub mod error;
pub mod health;
pub mod leaderboard;
pub mod profiles;
pub mod scheduler;
