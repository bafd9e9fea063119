//! Scroll routing CLI commands: run the daemon, inspect status, probe a position.

use colored::Colorize;
use serde::Serialize;

use super::config_cmd::effective_config;
use crate::cli::output::{format_bool, print_highlighted_json};
use crate::config::{self, ScrollConfig};
use crate::error::TopscrollError;
use crate::platform;
use crate::routing::{Point, ProbeReport};

/// Static status of the local installation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub version: &'static str,
    pub platform_supported: bool,
    pub accessibility_trusted: bool,
    pub config_path: Option<String>,
    pub scroll: ScrollConfig,
}

/// Runs the rerouting daemon until the process is terminated.
///
/// # Errors
///
/// Returns an error if the event tap cannot be installed or the platform is
/// not supported.
pub fn run() -> Result<(), TopscrollError> {
    let config = config::init().scroll.clone();
    tracing::info!(
        enabled = config.enabled,
        hop_limit = config.hop_limit,
        devices = ?config.device_filter,
        "starting scroll rerouting"
    );
    platform::run_daemon(config)
}

/// Prints whether rerouting can work on this machine.
///
/// # Errors
///
/// Returns an error if the configuration file is invalid.
pub fn status(json: bool) -> Result<(), TopscrollError> {
    let config = effective_config()?;
    let report = StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        platform_supported: platform::is_supported(),
        accessibility_trusted: platform::is_accessibility_trusted(),
        config_path: config::load_config().ok().map(|(_, path)| path.display().to_string()),
        scroll: config.scroll,
    };

    if json {
        print_highlighted_json(&serde_json::to_value(&report)?);
        return Ok(());
    }

    println!("{} {}", "topscroll".bold(), report.version);
    println!("  platform supported:     {}", format_bool(report.platform_supported));
    println!("  accessibility granted:  {}", format_bool(report.accessibility_trusted));
    println!("  rerouting enabled:      {}", format_bool(report.scroll.enabled));
    println!(
        "  config file:            {}",
        report.config_path.as_deref().unwrap_or("(defaults)")
    );

    if report.platform_supported && !report.accessibility_trusted {
        println!(
            "\n{}",
            "Grant accessibility access in System Settings › Privacy & Security.".yellow()
        );
    }
    Ok(())
}

/// Reports what would happen to a scroll at the given position.
///
/// Without coordinates the current pointer position is used.
///
/// # Errors
///
/// Returns [`TopscrollError::InvalidArguments`] if only one coordinate is
/// given, and the platform error if the lookup cannot run at all.
pub fn probe(x: Option<f64>, y: Option<f64>, json: bool) -> Result<(), TopscrollError> {
    let position = match (x, y) {
        (Some(x), Some(y)) => Some(Point::new(x, y)),
        (None, None) => None,
        _ => {
            return Err(TopscrollError::InvalidArguments(
                "Both --x and --y must be given".to_string(),
            ));
        }
    };

    let config = effective_config()?.scroll;
    let report = platform::probe(position, config)?;

    if json {
        print_highlighted_json(&serde_json::to_value(&report)?);
    } else {
        print_probe(&report);
    }
    Ok(())
}

fn print_probe(report: &ProbeReport) {
    println!(
        "{} ({:.0}, {:.0})  epoch {}  hop limit {}",
        "probe".bold(),
        report.position.x,
        report.position.y,
        report.epoch,
        report.hop_limit
    );

    for hop in &report.hops {
        let role = hop.role.as_deref().unwrap_or("?");
        let marker = if hop.scrollable { "scrollable".green() } else { "-".dimmed() };
        println!("  {:>2}  {role:<24} {marker}", hop.hop);
    }

    if let Some(failure) = &report.failure {
        println!("  {} {failure}", "lookup failed:".red());
    }
    if let Some(frame) = report.target_frame {
        println!(
            "  target frame: ({:.0}, {:.0}) {:.0}×{:.0}",
            frame.x, frame.y, frame.width, frame.height
        );
    }
    if let Some(point) = report.delivery_point {
        println!("  delivered at: ({:.0}, {:.0})", point.x, point.y);
    }
    println!("  verdict: {}", report.verdict.bold());
}
