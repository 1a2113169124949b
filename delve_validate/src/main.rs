use anyhow::{Result, anyhow};
use clap::Parser;
use delve_core::config::SecurityConfig;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

/// Delve Security Configuration Validator
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Validates delve security configuration files: JSON structure, unknown fields, sandbox roots, limits, and per-command narrowing."
)]
struct Cli {
    /// Directory of configuration JSON files, a comma-separated list of files, or blank for '.delve'.
    #[arg(default_value = ".delve")]
    validation_target: String,

    /// Print the JSON schema of the configuration format and exit.
    #[arg(long)]
    print_schema: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_schema {
        println!(
            "{}",
            serde_json::to_string_pretty(&SecurityConfig::json_schema())?
        );
        return Ok(());
    }

    let log_level = if cli.debug { "debug" } else { "info" };
    delve_core::utils::logging::init_logging(log_level, false)?;

    if run_validation_mode(&cli.validation_target)? {
        info!("All configurations are valid.");
        Ok(())
    } else {
        Err(anyhow!(
            "Some configurations are invalid. Please check the error messages above."
        ))
    }
}

fn run_validation_mode(validation_target: &str) -> Result<bool> {
    let mut all_valid = true;

    let mut files_to_validate = Vec::new();
    for target in validation_target.split(',').map(str::trim) {
        let path = PathBuf::from(target);
        if path.is_dir() {
            files_to_validate.extend(get_json_files(&path)?);
        } else if path.is_file() {
            files_to_validate.push(path);
        } else {
            error!("Validation target not found: {}", path.display());
            all_valid = false;
        }
    }

    if files_to_validate.is_empty() && all_valid {
        warn!("No configuration files found in '{validation_target}'");
    }

    for file_path in files_to_validate {
        match validate_file(&file_path) {
            Ok(problems) if problems.is_empty() => {
                info!("{} is valid.", file_path.display());
            }
            Ok(problems) => {
                for problem in &problems {
                    error!("{}: {}", file_path.display(), problem);
                }
                all_valid = false;
            }
            Err(e) => {
                error!("Validation failed for {}: {:#}", file_path.display(), e);
                all_valid = false;
            }
        }
    }

    Ok(all_valid)
}

/// Problems found in one file. An unreadable or unparsable file is an error.
fn validate_file(path: &Path) -> Result<Vec<String>> {
    let config = SecurityConfig::load_from_file(path)?;
    Ok(config.validate())
}

fn get_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_of_valid_files_passes() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.json"), "{}").unwrap();
        fs::write(
            temp.path().join("b.json"),
            r#"{"commands": {"rg": {"deny_flags": ["--hidden"]}}}"#,
        )
        .unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(get_json_files(temp.path()).unwrap().len(), 2);
        assert!(run_validation_mode(temp.path().to_str().unwrap()).unwrap());
    }

    #[test]
    fn test_semantic_problems_fail_validation() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("bad.json");
        fs::write(&file, r#"{"commands": {"find": {"deny_flags": ["-exec"]}}}"#).unwrap();

        assert_eq!(validate_file(&file).unwrap().len(), 1);
        assert!(!run_validation_mode(file.to_str().unwrap()).unwrap());
    }

    #[test]
    fn test_unparsable_and_missing_targets_fail() {
        let temp = tempfile::tempdir().unwrap();
        let broken = temp.path().join("broken.json");
        fs::write(&broken, r#"{"allow_everything": true}"#).unwrap();
        let missing = temp.path().join("missing.json");

        let target = format!("{}, {}", broken.display(), missing.display());
        assert!(!run_validation_mode(&target).unwrap());
    }
}
