pub mod cli;
pub mod ingest;
pub mod journal;
pub mod orchestrator;
