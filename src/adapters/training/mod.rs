pub mod dataset;
pub mod ultralytics_cli;
