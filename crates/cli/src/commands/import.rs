//! `arbor import`: load fragments from a JSON array.

use arbor_core::fragment::{Fragment, FragmentRecord};

/// Parse a JSON array of fragment records. Records without a client are
/// placed in `client_id`.
pub fn parse_fragments(json: &str, client_id: i64) -> Result<Vec<FragmentRecord>, serde_json::Error> {
    let mut records: Vec<FragmentRecord> = serde_json::from_str(json)?;
    for record in &mut records {
        if record.client_id == 0 {
            record.client_id = client_id;
        }
    }
    Ok(records)
}

pub async fn run(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let json = std::fs::read_to_string(file).map_err(|e| format!("Failed to read {file}: {e}"))?;
    let records = parse_fragments(&json, config.scope.client_id)?;
    let stores = super::open_stores(&config).await?;

    let mut imported = 0;
    let mut invalid = 0;
    for record in records {
        // Stored regardless; assembly skips malformed rows on its own
        if let Err(e) = Fragment::try_from(record.clone()) {
            println!("  ⚠️  {e}");
            invalid += 1;
        }
        stores.fragments.insert_fragment(record).await?;
        imported += 1;
    }

    println!("✅ Imported {imported} fragments into the {} store ({invalid} malformed)", stores.backend);
    Ok(())
}
