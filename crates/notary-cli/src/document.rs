//! # Document Commands
//!
//! - `notary upload FILE [--filename NAME] [--meta KEY=VALUE]...`
//! - `notary validate CODE`
//! - `notary pending`
//!
//! Results are printed as pretty JSON. `validate` exits with 2 when the
//! code is unknown.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use notary_core::DocumentCode;
use notary_engine::{EngineError, NotaryService, UploadRequest};

use crate::digest::read_input;

/// Exit code for an unknown document code.
pub const EXIT_NOT_FOUND: u8 = 2;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to notarize, or `-` for stdin.
    pub file: PathBuf,

    /// Filename recorded with the document. Defaults to the file's basename.
    #[arg(long)]
    pub filename: Option<String>,

    /// Descriptive metadata, repeatable.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub metadata: Vec<(String, String)>,
}

impl UploadArgs {
    fn request(&self) -> UploadRequest {
        let filename = self.filename.clone().or_else(|| {
            if self.file.as_os_str() == "-" {
                return None;
            }
            self.file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });
        let mut request = UploadRequest::default();
        if let Some(name) = filename {
            request = request.with_filename(name);
        }
        self.metadata
            .iter()
            .fold(request, |req, (k, v)| req.with_metadata(k, v))
    }
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document code returned by `upload`.
    pub code: String,
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {s:?}"))?;
    if key.trim().is_empty() {
        return Err(anyhow!("metadata key must not be empty"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

pub async fn run_upload(
    service: &NotaryService,
    args: &UploadArgs,
    out: &mut dyn Write,
) -> Result<u8> {
    let content = read_input(&args.file)?;
    let receipt = service
        .upload(&content, args.request())
        .await
        .context("upload failed")?;
    writeln!(out, "{}", serde_json::to_string_pretty(&receipt)?)?;
    Ok(0)
}

pub async fn run_validate(
    service: &NotaryService,
    args: &ValidateArgs,
    out: &mut dyn Write,
) -> Result<u8> {
    let code = DocumentCode::parse(&args.code)
        .with_context(|| format!("invalid document code {:?}", args.code))?;
    match service.validate(&code).await {
        Ok(report) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            Ok(0)
        }
        Err(EngineError::NotFound(code)) => {
            tracing::error!(code = %code, "document not found");
            Ok(EXIT_NOT_FOUND)
        }
        Err(e) => Err(e).context("validation failed"),
    }
}

/// List documents still awaiting confirmation, oldest first.
pub async fn run_pending(service: &NotaryService, out: &mut dyn Write) -> Result<u8> {
    let docs = service.pending().await?;
    let receipts: Vec<_> = docs.iter().map(notary_engine::UploadReceipt::from).collect();
    writeln!(out, "{}", serde_json::to_string_pretty(&receipts)?)?;
    Ok(0)
}
