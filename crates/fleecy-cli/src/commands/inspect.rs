use std::fmt;
use std::path::Path;

use fleecy_selection::{AdmissionCriteria, FleetStats, UtilizationReport};

use super::{Session, load_config};

pub async fn utilizations(config_path: &Path, participant_id: &str, format: &str) -> anyhow::Result<()> {
    let session = Session::open(config_path, participant_id)?;
    let rows = session.selector.utilizations(&session.participant).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => print!("{}", UtilizationTable(&rows)),
    }
    Ok(())
}

pub async fn stats(config_path: &Path, participant_id: &str) -> anyhow::Result<()> {
    let session = Session::open(config_path, participant_id)?;
    let stats = session.selector.fleet_stats(&session.participant).await?;
    print!("{}", format_stats(&session.participant.id, &stats));
    Ok(())
}

pub fn check_config(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let criteria = AdmissionCriteria::resolve(&config.criteria)?;

    println!("✓ {} is valid", config_path.display());
    println!(
        "  provider: {:?} (prometheus port {}, timeout {})",
        config.provider.mode, config.provider.prometheus_port, config.provider.request_timeout
    );
    println!("  default criteria: {criteria}");
    for p in &config.participants {
        println!(
            "  participant {} ({}): endpoint {}  credential {}",
            p.id,
            p.name,
            if p.openstack_endpoint.is_empty() { "-" } else { p.openstack_endpoint.as_str() },
            if p.has_credentials() { "set" } else { "missing" }
        );
    }
    Ok(())
}

pub fn format_utilizations(rows: &[UtilizationReport]) -> String {
    UtilizationTable(rows).to_string()
}

struct UtilizationTable<'a>(&'a [UtilizationReport]);

impl fmt::Display for UtilizationTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:<10} {:>6} {:>6} {:>6} {:>6}  {}",
            "VM", "STATUS", "CPU%", "MEM%", "DISK%", "SCORE", "HEALTH"
        )?;
        for row in self.0 {
            let health = match (&row.error, row.utilization.is_healthy) {
                (Some(_), _) => "unavailable",
                (None, true) => "healthy",
                (None, false) => "unhealthy",
            };
            writeln!(
                f,
                "{:<24} {:<10} {:>6.1} {:>6.1} {:>6.1} {:>6.1}  {}",
                row.candidate.name,
                row.candidate.status.as_str(),
                row.utilization.cpu_usage_percent,
                row.utilization.memory_usage_percent,
                row.utilization.disk_usage_percent,
                row.utilization_score,
                health
            )?;
        }
        Ok(())
    }
}

pub fn format_stats(participant_id: &str, stats: &FleetStats) -> String {
    format!(
        "{participant_id}: {} VMs ({} active, {} building, {} error, {} shutoff, {} other)\n",
        stats.total, stats.active, stats.building, stats.error, stats.shutoff, stats.other
    )
}
