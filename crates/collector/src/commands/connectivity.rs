//! `test`: open and close one channel per host

use crate::config::CollectorConfig;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};

pub async fn run(config: &CollectorConfig, format: OutputFormat) -> Result<()> {
    let coordinator = super::coordinator(config)?;
    let reports = coordinator.test_connectivity().await?;

    println!("{}", output::render_connectivity(&reports, format)?);

    let reachable = reports.iter().filter(|r| r.reachable).count();
    if reachable == 0 {
        bail!("no host could be reached");
    }
    output::print_success(&format!("{} of {} hosts reachable", reachable, reports.len()));
    Ok(())
}
