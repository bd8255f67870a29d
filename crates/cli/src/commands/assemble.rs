//! `arbor assemble`: run one assembly pass.

use std::sync::Arc;

use arbor_assembly::{AssemblyContext, AssemblySettings, TreeAssembler};
use arbor_core::event::EventBus;
use arbor_core::store::Scope;

pub async fn run(session: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let stores = super::open_stores(&config).await?;

    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            tracing::debug!(?event, "Assembly event");
        }
    });

    let ctx = AssemblyContext::new(stores.fragments, stores.diagrams, Scope::client(config.scope.client_id))
        .with_settings(AssemblySettings::from(&config))
        .with_events(events);
    let report = TreeAssembler::new(ctx).assemble_at(session, chrono::Utc::now()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &report.lines {
            println!("  {line}");
        }
    }

    if let Some(error) = report.error {
        return Err(error.into());
    }
    Ok(())
}
