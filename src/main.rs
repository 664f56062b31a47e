use std::{
    fs::OpenOptions,
    path::PathBuf,
    sync::{Arc, Mutex},
    thread,
};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use task_orchestrator::app::{
    cli,
    ingest,
    journal::{InteractionLog, JsonlJournal, NullJournal},
    orchestrator::Orchestrator,
};
use task_orchestrator::config::OrchestratorConfig;
use task_orchestrator::llm::client::HttpCompletionClient;
use task_orchestrator::manager::task_manager::TaskManager;

#[derive(Parser, Debug)]
#[command(about = "Turns plain-language requests into prioritized tasks")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, default_value = "config/orchestrator.toml")]
    config: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("task_orchestrator=info"));
    match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let config = Arc::new(OrchestratorConfig::load(&args.config)?);
    let backend = HttpCompletionClient::from_params(&config.llm)?;

    let manager = TaskManager::new(config.orchestrator.default_priority);
    manager.start();

    let journal: Box<dyn InteractionLog> = match &config.orchestrator.journal_path {
        Some(path) => Box::new(JsonlJournal::open(path)?),
        None => Box::new(NullJournal),
    };

    let (inbox, messages) = ingest::inbox(config.orchestrator.queue_capacity);
    let (reply_sender, replies) = crossbeam_channel::unbounded();
    let orchestrator = Orchestrator::new(
        backend,
        config.clone(),
        manager.dispatcher(),
        manager.registry(),
        journal,
    );
    thread::spawn(move || orchestrator.run(messages, reply_sender));

    log::info!("Task orchestrator ready, model {}.", config.llm.model_name);
    cli::run_cli(&manager, inbox, replies)?;
    Ok(())
}
