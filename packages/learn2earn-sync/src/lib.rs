// Learn2Earn Status Sync - Core
//
// Keeps the stored lifecycle status of Learn2Earn opportunities in line with
// their dates and participant counts. Runs once a day from a cron scheduler.
//
// Infrastructure lives in kernel/, the status rules and the sync itself in
// domains/learn2earn/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
