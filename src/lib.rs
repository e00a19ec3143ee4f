pub mod analyzers;
pub mod cache;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod report;
