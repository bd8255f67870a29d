//! `arbor diagrams` and `arbor show`.

use arbor_core::store::{Scope, Window};
use chrono::{Duration, Utc};

pub async fn list(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let stores = super::open_stores(&config).await?;
    let scope = Scope::client(config.scope.client_id);
    let window = Window::trailing(Utc::now(), Duration::days(i64::from(config.windows.recency_days)), limit);

    let diagrams = stores.diagrams.fetch_recent_diagrams(scope, window).await?;
    if diagrams.is_empty() {
        println!("   No diagrams in the last {} days.", config.windows.recency_days);
        return Ok(());
    }

    println!("🌳 Recent diagrams");
    for d in diagrams {
        println!(
            "  {}  {:<22} {}  {}",
            d.created_at.format("%Y-%m-%d %H:%M"),
            d.diagram_type.as_str(),
            d.id,
            d.title
        );
    }
    Ok(())
}

pub async fn show(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let stores = super::open_stores(&config).await?;

    let diagram = stores
        .diagrams
        .get_diagram(id)
        .await?
        .ok_or_else(|| format!("Diagram {id} not found"))?;
    println!("{}", serde_json::to_string_pretty(&diagram.payload)?);

    for rel in stores.diagrams.relationships_for(id).await? {
        println!("  {} -[{}]-> {}", rel.from_diagram_id, rel.relationship_type, rel.to_diagram_id);
    }
    Ok(())
}
