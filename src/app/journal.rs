use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::error::JournalError;
use crate::models::command::CommandDetails;

/// Durable record of interactions. Callers treat failures as non-fatal.
pub trait InteractionLog: Send {
    fn record_exchange(&mut self, user_input: &str, model_output: &str) -> Result<(), JournalError>;

    fn record_task(&mut self, task_name: &str, details: &CommandDetails) -> Result<(), JournalError>;
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Entry<'a> {
    Exchange {
        at: u64,
        user_input: &'a str,
        model_output: &'a str,
    },
    Task {
        at: u64,
        task_name: &'a str,
        details: &'a CommandDetails,
    },
}

/// Appends one JSON object per line.
pub struct JsonlJournal {
    writer: BufWriter<File>,
}

impl JsonlJournal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn append(&mut self, entry: &Entry<'_>) -> Result<(), JournalError> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl InteractionLog for JsonlJournal {
    fn record_exchange(&mut self, user_input: &str, model_output: &str) -> Result<(), JournalError> {
        self.append(&Entry::Exchange {
            at: now(),
            user_input,
            model_output,
        })
    }

    fn record_task(&mut self, task_name: &str, details: &CommandDetails) -> Result<(), JournalError> {
        self.append(&Entry::Task {
            at: now(),
            task_name,
            details,
        })
    }
}

pub struct NullJournal;

impl InteractionLog for NullJournal {
    fn record_exchange(&mut self, _: &str, _: &str) -> Result<(), JournalError> {
        Ok(())
    }

    fn record_task(&mut self, _: &str, _: &CommandDetails) -> Result<(), JournalError> {
        Ok(())
    }
}
