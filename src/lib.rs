pub mod timestamps;
pub mod timewindow;
pub mod config;
pub mod store;
pub mod table;
pub mod matcher;
pub mod categorize;
pub mod chart;
pub mod resolver;
pub mod shaper;
pub mod error;
pub mod assembler;
pub mod summary;
