//! `arbor status`: show configuration and store status.

use arbor_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let w = &config.windows;

    println!("🌳 Arbor Status");
    println!("===============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Client:       {}", config.scope.client_id);
    println!("  Store:        {}", config.store.backend);
    println!("  Recency:      {} days", w.recency_days);
    println!(
        "  Limits:       {} unassigned, {} partial, {} diagrams",
        w.unassigned_limit, w.partial_limit, w.recent_diagram_limit
    );
    println!("  Extend:       {} hours", w.extend_window_hours);
    println!("  Threshold:    {}", w.partial_confidence_threshold);
    println!("  Confidence:   {} (default)", config.default_confidence);

    if config.store.backend == "sqlite" {
        let db_path = config.store.resolved_path();
        if db_path.exists() {
            let size_kb = std::fs::metadata(&db_path)?.len() as f64 / 1024.0;
            println!("  DB file:      {} ({:.1} KB)", db_path.display(), size_kb);
        } else {
            println!("  DB file:      (not created yet)");
        }
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `arbor init` first");
    }

    Ok(())
}
