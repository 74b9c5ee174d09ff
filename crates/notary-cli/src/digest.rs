//! `notary digest`: print the SHA-256 digest a document would be notarized under.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// File to digest, or `-` for stdin.
    pub file: PathBuf,
}

pub fn run_digest(args: &DigestArgs, out: &mut dyn Write) -> Result<u8> {
    let content = read_input(&args.file)?;
    writeln!(out, "{}", notary_core::sha256_hex(&content))?;
    Ok(0)
}

/// Read `path`, treating `-` as stdin.
pub(crate) fn read_input(path: &std::path::Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_lowercase_hex_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        let mut out = Vec::new();
        let code = run_digest(&DigestArgs { file: path }, &mut out).unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\n"
        );
    }

    #[test]
    fn missing_file_names_the_path() {
        let mut out = Vec::new();
        let err = run_digest(
            &DigestArgs {
                file: PathBuf::from("/nonexistent/notary/input.bin"),
            },
            &mut out,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/notary/input.bin"));
        assert!(out.is_empty());
    }
}
