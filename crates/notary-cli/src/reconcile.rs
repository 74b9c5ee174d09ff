//! `notary reconcile`: run one reconciliation pass and print its report.

use std::io::Write;

use anyhow::{Context, Result};

use notary_engine::NotaryService;

pub async fn run_reconcile(service: &NotaryService, out: &mut dyn Write) -> Result<u8> {
    let report = service.reconcile().await.context("reconciliation failed")?;
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(0)
}
