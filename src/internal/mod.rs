pub mod coverage;
pub mod models;
pub mod notification;
pub mod report;
pub mod search;
pub mod snapshots;
pub mod state;
pub mod ui;
