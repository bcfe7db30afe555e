//! Terminal presentation of tracker views.

pub mod detail;
pub mod markets;
pub mod portfolio;
pub mod setup;
pub mod ui;
