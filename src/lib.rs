//! gator: a multi-user RSS aggregator.
//!
//! Feeds are fetched in least-recently-fetched rotation by
//! [`aggregator::RotationScheduler`], parsed by [`feed`], and stored through
//! the [`storage::Store`] interface. Users read them back with
//! [`retrieval::RetrievalEngine`] or the terminal viewer in [`ui`].

pub mod aggregator;
pub mod cli;
pub mod commands;
pub mod config;
pub mod feed;
pub mod retrieval;
pub mod storage;
pub mod ui;
