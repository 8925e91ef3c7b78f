use std::fmt;
use std::path::Path;

use fleecy_core::{SelectionCriteria, VmStatus};
use fleecy_selection::SelectionReport;

use super::Session;

/// Criteria given on the command line; unset fields defer to the config.
#[derive(Debug, Default)]
pub struct SelectArgs {
    pub model_size: Option<i64>,
    pub min_vcpus: Option<i64>,
    pub min_ram: Option<i64>,
    pub min_disk: Option<i64>,
    pub max_cpu: Option<f64>,
    pub status: Option<String>,
}

impl SelectArgs {
    pub fn to_criteria(&self) -> SelectionCriteria {
        SelectionCriteria {
            min_vcpus: self.min_vcpus.unwrap_or(0),
            min_ram_mb: self.min_ram.unwrap_or(0),
            min_disk_gb: self.min_disk.unwrap_or(0),
            required_status: self.status.as_deref().map(VmStatus::from),
            max_cpu_usage_percent: self.max_cpu.unwrap_or(0.0),
            model_size_mb: self.model_size.unwrap_or(0),
        }
    }
}

pub async fn select(
    config_path: &Path,
    participant_id: &str,
    args: &SelectArgs,
    format: &str,
) -> anyhow::Result<()> {
    let session = Session::open(config_path, participant_id)?;
    let criteria = session.config.criteria.overlay(&args.to_criteria());
    let report = session.selector.select(&session.participant, &criteria).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", ReportText(&report)),
    }
    Ok(())
}

pub fn format_report(report: &SelectionReport) -> String {
    ReportText(report).to_string()
}

/// Human-readable rendering of a [`SelectionReport`].
struct ReportText<'a>(&'a SelectionReport);

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        match &report.selected {
            Some(vm) => {
                writeln!(f, "✓ Selected {} ({})", vm.name, vm.id)?;
                writeln!(
                    f,
                    "  flavor {}: {} vCPU, {} MB RAM, {} GB disk",
                    vm.flavor_name, vm.vcpus, vm.ram_mb, vm.disk_gb
                )?;
                if let Some(u) = &report.utilization {
                    writeln!(
                        f,
                        "  usage: cpu {:.1}%  memory {:.1}%  disk {:.1}%  healthy {}",
                        u.cpu_usage_percent, u.memory_usage_percent, u.disk_usage_percent, u.is_healthy
                    )?;
                }
            }
            None => writeln!(f, "✗ No VM selected")?,
        }
        writeln!(f, "  reason: {}", report.reason)?;
        writeln!(
            f,
            "  criteria: {}  examined {}  final-stage count {}",
            report.criteria, report.examined, report.candidate_count
        )?;

        if !report.exclusions.is_empty() {
            writeln!(f, "  excluded:")?;
            for exclusion in &report.exclusions {
                writeln!(f, "    - {exclusion}")?;
            }
        }
        Ok(())
    }
}
