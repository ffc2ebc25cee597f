//! One-off abandonment sweep.

use chrono::Utc;

/// Run a single sweep with the stored settings and print the report.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the sweep fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let state = super::connect().await?;

    tracing::info!("Running abandonment sweep...");
    let report = state.sweeper().sweep(Utc::now()).await?;

    tracing::info!(
        candidates = report.candidates,
        delivered = report.delivered,
        failed = report.failed,
        expired = report.expired,
        "Sweep complete"
    );
    super::print_json(&report)?;
    Ok(())
}
