use anyhow::Result;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::Path;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::models::quota::QuotaSummary;
use crate::core::models::usage::{UsageSummary, Window};
use crate::core::providers::fetch::{self, Origin};
use crate::core::providers::{DataSource, Platform};

#[derive(Serialize)]
#[serde(untagged)]
enum Report {
    Usage(UsageSummary),
    Quota(QuotaSummary),
}

#[derive(Serialize)]
struct PlatformPayload {
    platform: &'static str,
    origin: Origin,
    data: Report,
}

fn parse_platforms(filter: Option<&str>) -> Result<Vec<Platform>> {
    match filter {
        None | Some("all") => Ok(Platform::all().to_vec()),
        Some(id) => match Platform::from_id(id) {
            Some(p) => Ok(vec![p]),
            None => anyhow::bail!("Unknown platform: '{}' (expected gemini, supabase or all)", id),
        },
    }
}

async fn fetch_platform(
    platform: Platform,
    window: Window,
    config: &AppConfig,
    source: Option<DataSource>,
) -> (Origin, Report) {
    match platform {
        Platform::Gemini => {
            let result = fetch::gemini_usage(window, &config.gemini, source).await;
            (result.origin, Report::Usage(result.data))
        }
        Platform::Supabase => {
            let result = fetch::supabase_quota(&config.supabase, source).await;
            (result.origin, Report::Quota(result.data))
        }
    }
}

pub async fn run(
    platform_filter: Option<String>,
    window: Option<String>,
    source: Option<String>,
    config_path: Option<&Path>,
    opts: &OutputOptions,
) -> Result<()> {
    let window: Window = match window.as_deref() {
        Some(w) => w.parse()?,
        None => Window::default(),
    };
    let source = match source.as_deref() {
        Some(s) => match DataSource::from_id(s) {
            Some(source) => Some(source),
            None => anyhow::bail!("Unknown source: '{}' (expected auto, live or synthetic)", s),
        },
        None => None,
    };
    let platforms = parse_platforms(platform_filter.as_deref())?;
    let config = std::sync::Arc::new(AppConfig::load(config_path)?);

    let show_spinner = matches!(opts.format, OutputFormat::Text) && std::io::stderr().is_terminal();
    let spinner = if show_spinner {
        Some(tokio::spawn(async move {
            let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut i = 0usize;
            loop {
                eprint!("\r {} Fetching usage data...", frames[i % frames.len()]);
                i = i.wrapping_add(1);
                tokio::time::sleep(std::time::Duration::from_millis(80)).await;
            }
        }))
    } else {
        None
    };

    // Fetch all platforms concurrently
    let handles: Vec<_> = platforms
        .into_iter()
        .map(|platform| {
            let config = config.clone();
            tokio::spawn(async move {
                let (origin, report) = fetch_platform(platform, window, &config, source).await;
                (platform, origin, report)
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await?);
    }

    if let Some(s) = spinner {
        s.abort();
        eprint!("\r\x1b[2K");
    }

    match opts.format {
        OutputFormat::Text => {
            let sections: Vec<String> = results
                .iter()
                .map(|(_, origin, report)| match report {
                    Report::Usage(summary) => {
                        renderer::render_usage(summary, window, *origin, opts.use_color)
                    }
                    Report::Quota(summary) => renderer::render_quota(summary, *origin, opts.use_color),
                })
                .collect();
            println!("{}", sections.join("\n\n"));

            for (platform, origin, _) in &results {
                if *origin == Origin::Fallback {
                    eprintln!(
                        "{} data unavailable; check {} (run with -v for details)",
                        platform.display_name(),
                        platform.auth_hint()
                    );
                }
            }
        }
        OutputFormat::Json => {
            let payloads: Vec<PlatformPayload> = results
                .into_iter()
                .map(|(platform, origin, data)| PlatformPayload {
                    platform: platform.id(),
                    origin,
                    data,
                })
                .collect();

            let json = if opts.pretty {
                serde_json::to_string_pretty(&payloads)?
            } else {
                serde_json::to_string(&payloads)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
