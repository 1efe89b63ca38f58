/// Export DOE tables and study summaries to CSV for spreadsheet analysis
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::runner::StudySummary;
use crate::dedup::FeatureTable;
use crate::error::Result;

/// One row per scenario: `Scenario_ID` then every feature column.
/// Missing cells are left empty.
pub fn export_table_csv<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path.as_ref())?);

    write!(file, "Scenario_ID")?;
    for column in table.columns() {
        write!(file, ",{}", column)?;
    }
    writeln!(file)?;

    for (id, row) in table.ids().iter().zip(table.rows()) {
        write!(file, "{}", id)?;
        for value in row {
            if value.is_nan() {
                write!(file, ",")?;
            } else {
                write!(file, ",{}", value)?;
            }
        }
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}

/// One row per cluster: representative id, size and member ids
/// (space separated), in the order clusters were formed.
pub fn export_clusters_csv<P: AsRef<Path>>(
    table: &FeatureTable,
    clusters: &[Vec<usize>],
    representatives: &[usize],
    path: P,
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    writeln!(file, "Cluster,Representative,Size,Members")?;
    for (k, (members, &rep)) in clusters.iter().zip(representatives).enumerate() {
        let ids: Vec<String> = members.iter().map(|&i| table.id(i).to_string()).collect();
        writeln!(file, "{},{},{},{}", k, table.id(rep), members.len(), ids.join(" "))?;
    }
    file.flush()?;
    Ok(())
}

/// Export the one-line study summary
pub fn export_doe_summary<P: AsRef<Path>>(summary: &StudySummary, output_dir: P) -> Result<()> {
    let filename = output_dir.as_ref().join("DOE_Summary.csv");
    let mut file = File::create(&filename)?;

    writeln!(
        file,
        "Study,Analysis,Parameters,Scenarios,Kept,Removed,Clusters,Eps,Scale,Max_Rho_Error"
    )?;

    let eps_str = summary.eps.map(|e| e.to_string()).unwrap_or_else(|| "N/A".to_string());
    let scale_str = summary.scale.map(|s| s.to_string()).unwrap_or_else(|| "N/A".to_string());
    let rho_str = summary
        .max_rho_error
        .map(|e| format!("{:.4}", e))
        .unwrap_or_else(|| "N/A".to_string());

    writeln!(
        file,
        "{},{},{},{},{},{},{},{},{},{}",
        summary.study_name,
        summary.analysis,
        summary.n_parameters,
        summary.n_scenarios,
        summary.n_kept,
        summary.n_removed,
        summary.n_clusters,
        eps_str,
        scale_str,
        rho_str
    )?;

    tracing::info!(path = %filename.display(), "exported DOE summary");
    Ok(())
}
