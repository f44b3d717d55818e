use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::core::config::AppConfig;
use crate::core::providers::Platform;

fn resolve_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path)
}

pub fn init(path: Option<&Path>, _opts: &OutputOptions) -> Result<()> {
    let path = resolve_path(path);
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save(&path) {
        Ok(()) => {
            println!("Generated config at {}", path.display());
            println!("  Both platforms use source = \"auto\": live when credentials are set, synthetic otherwise.");
            for platform in Platform::all() {
                println!("  {}: {}", platform.display_name(), platform.auth_hint());
            }
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(path: Option<&Path>, _opts: &OutputOptions) -> Result<()> {
    let path = resolve_path(path);
    if !path.exists() {
        eprintln!("No config file found at {}; checking defaults and environment.", path.display());
    }

    let config = match AppConfig::load(Some(&path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        println!("Config is valid: {}", path.display());
        let gemini = config.gemini.source.resolve(config.gemini.has_credentials());
        let supabase = config.supabase.source.resolve(config.supabase.has_credentials());
        println!("  {}: {}", Platform::Gemini.display_name(), gemini.id());
        println!("  {}: {}", Platform::Supabase.display_name(), supabase.id());
    } else {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Print the effective config (file plus environment) with secrets masked.
pub fn show(path: Option<&Path>, opts: &OutputOptions) -> Result<()> {
    let config = AppConfig::load(path)?.redacted();
    let rendered = match opts.format {
        OutputFormat::Text => toml::to_string_pretty(&config)?,
        OutputFormat::Json if opts.pretty => serde_json::to_string_pretty(&config)?,
        OutputFormat::Json => serde_json::to_string(&config)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
