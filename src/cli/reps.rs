//! Representative listing and ingestion commands.

use std::path::Path;

use anyhow::Context;

use crate::store::{NewRepresentative, Representative, Store};

/// List representatives, optionally filtered by a search term or constituency.
pub async fn run_reps_command(
    store: &Store,
    search: Option<&str>,
    constituency: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let reps = match (search, constituency) {
        (Some(term), _) => store.search_representatives(term).await?,
        (None, Some(name)) => store.get_representative_by_location(name).await?,
        (None, None) => store.get_all_representatives().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reps)?);
        return Ok(());
    }

    if reps.is_empty() {
        println!("No representatives found.");
        return Ok(());
    }

    println!("{} representative(s):\n", reps.len());
    for rep in &reps {
        print_representative(rep);
    }
    Ok(())
}

fn print_representative(rep: &Representative) {
    println!(
        "{:>4}  {} ({}, {})",
        rep.id,
        rep.name,
        rep.role,
        rep.party.as_deref().unwrap_or("-")
    );
    println!(
        "      {}, {}",
        rep.constituency.as_deref().unwrap_or("-"),
        rep.state.as_deref().unwrap_or("-")
    );
    if let (Some(spent), Some(total)) = (rep.funds_spent_crores, rep.funds_total_crores) {
        println!(
            "      Funds: {:.1} / {:.1} cr ({})",
            spent,
            total,
            utilization(spent, total)
        );
    }
    if let Some(attendance) = rep.attendance_percentage {
        println!("      Attendance: {}%", attendance);
    }
    println!();
}

fn utilization(spent: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{:.0}% used", spent / total * 100.0)
    } else {
        "no allocation".to_string()
    }
}

/// Import a JSON array of representatives from `path`.
pub async fn run_ingest_command(store: &Store, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let reps: Vec<NewRepresentative> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of representatives", path.display()))?;

    let inserted = store.ingest_representatives(&reps).await?;
    println!(
        "Ingested {} of {} representative(s) from {} ({} already present)",
        inserted,
        reps.len(),
        path.display(),
        reps.len() - inserted
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization() {
        assert_eq!(utilization(12.0, 15.0), "80% used");
        assert_eq!(utilization(50.5, 50.5), "100% used");
        assert_eq!(utilization(0.0, 0.0), "no allocation");
    }
}
