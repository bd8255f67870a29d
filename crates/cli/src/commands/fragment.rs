//! `arbor fragment`: a fragment's diagram memberships.

pub async fn run(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let stores = super::open_stores(&config).await?;

    let assignments = stores.diagrams.assignments_for_fragment(id).await?;
    if assignments.is_empty() {
        println!("   Fragment {id} is not assigned to any diagram.");
        return Ok(());
    }

    println!("🔗 Fragment {id} belongs to {} diagram(s)", assignments.len());
    for a in assignments {
        let kind = match stores.diagrams.get_diagram(&a.diagram_id).await? {
            Some(d) => d.diagram_type.to_string(),
            None => "(missing)".to_string(),
        };
        println!(
            "  {:<22} {}  node={} confidence={:.2}  [{}]",
            kind, a.diagram_id, a.node_id, a.confidence, a.reason
        );
    }
    Ok(())
}
