use anyhow::{Context as _, Result};
use conveyor::cli::commands::HistoryCommand;
use conveyor::cli::output::{format_last_run, format_pipeline_line, render_response, style, INFO};
use conveyor::cli::{Cli, Command};
use conveyor::{
    catalog, Account, AllowAll, CompletionLog, Gateway, GatewayRequest, GatewayResponse,
    LastRunRecorder, Orchestrator, PipelineRegistry, SqliteStateStore, StateStore, StepRegistry,
};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Registries are populated once, at startup
    let mut steps = StepRegistry::new();
    let mut pipelines = PipelineRegistry::new();
    catalog::register(&mut steps, &mut pipelines)
        .context("Failed to register built-in pipelines")?;
    let pipelines = Arc::new(pipelines);

    let store = Arc::new(match &cli.db {
        Some(path) => SqliteStateStore::new(path)
            .await
            .context("Failed to open state database")?,
        None => SqliteStateStore::with_default_path().await?,
    });

    let orchestrator = Orchestrator::new(Arc::new(steps), pipelines.clone(), store.clone())?
        .with_notifier(Arc::new(LastRunRecorder::new(store.clone())));
    let gateway = Gateway::new(Arc::new(orchestrator), Arc::new(AllowAll));
    let account = Account::new(cli.account.clone());

    match &cli.command {
        Command::Run(cmd) => {
            request(
                &gateway,
                &account,
                GatewayRequest::Execute {
                    pipeline_id: cmd.pipeline.clone(),
                    input: None,
                },
            )
            .await
        }
        Command::Submit(cmd) => {
            let input = cmd
                .values
                .iter()
                .cloned()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect();
            request(
                &gateway,
                &account,
                GatewayRequest::Execute {
                    pipeline_id: cmd.pipeline.clone(),
                    input: Some(input),
                },
            )
            .await
        }
        Command::Reset(cmd) => {
            request(
                &gateway,
                &account,
                GatewayRequest::Reset {
                    pipeline_id: cmd.pipeline.clone(),
                },
            )
            .await
        }
        Command::List(_) => list_pipelines(&pipelines, store.as_ref()).await?,
        Command::History(cmd) => show_history(cmd, store.as_ref()).await?,
    }

    Ok(())
}

/// Issue one gateway request and follow redirects, like an HTTP client
async fn request(gateway: &Gateway, account: &Account, first: GatewayRequest) {
    let mut next = first;
    loop {
        let response = gateway.handle(account, next).await;
        println!("{}", render_response(&response));

        match response {
            GatewayResponse::Redirect { to } => next = to,
            GatewayResponse::Error { .. } => std::process::exit(1),
            _ => break,
        }
    }
}

async fn list_pipelines(pipelines: &PipelineRegistry, store: &dyn StateStore) -> Result<()> {
    for definition in pipelines.all() {
        let state = store.load(&definition.id).await?;
        println!("{}", format_pipeline_line(definition, state.as_ref()));
    }
    Ok(())
}

async fn show_history(cmd: &HistoryCommand, log: &dyn CompletionLog) -> Result<()> {
    let now = chrono::Utc::now();

    let events = match &cmd.pipeline {
        Some(pipeline_id) => log
            .last_completion(pipeline_id)
            .await?
            .into_iter()
            .collect(),
        None => log.last_completions().await?,
    };

    if events.is_empty() {
        println!("{} {}", INFO, style("no completed runs yet").dim());
        return Ok(());
    }

    for event in &events {
        println!("{}", format_last_run(event, now));
    }
    Ok(())
}
