//! Environment readiness check.
//!
//! Reports the browser binary that would be launched and the effective
//! configuration. Every failure includes a fix instruction.

use crate::cli::output::{self, Styled};
use crate::config::BrowserConfiguration;
use crate::renderer::chromium::find_chromium;
use anyhow::{bail, Result};
use std::path::Path;
use std::process::Command;

pub async fn run() -> Result<()> {
    let s = Styled::new();
    let mut ready = true;

    eprintln!(
        "  {} v{}",
        s.bold("pagesift"),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!("  {}", s.bold("Browser"));

    let config = BrowserConfiguration::from_env();
    let chromium = config.executable_path.clone().or_else(find_chromium);
    match &chromium {
        Some(path) if path.exists() => {
            let version = chromium_version(path);
            output::print_check(
                s.ok_sym(),
                "Chromium:",
                &format!(
                    "{} at {}",
                    version.as_deref().unwrap_or("unknown version"),
                    path.display()
                ),
            );
        }
        Some(path) => {
            output::print_check(
                s.fail_sym(),
                "Chromium:",
                &format!("{} does not exist", path.display()),
            );
            output::print_detail("Fix: correct PAGESIFT_CHROMIUM_PATH");
            ready = false;
        }
        None => {
            output::print_check(s.fail_sym(), "Chromium:", "NOT FOUND");
            output::print_detail("Fix: install Chrome or Chromium, or place it in ~/.pagesift/chromium/");
            output::print_detail("Or set PAGESIFT_CHROMIUM_PATH=/path/to/chrome");
            ready = false;
        }
    }

    eprintln!();
    eprintln!("  {}", s.bold("Configuration"));
    match config.validate() {
        Ok(()) => {
            output::print_check(
                s.ok_sym(),
                "Viewport:",
                &format!("{}x{}", config.width, config.height),
            );
            output::print_check(
                s.ok_sym(),
                "Mode:",
                if config.headless { "headless" } else { "headful" },
            );
            output::print_check(s.ok_sym(), "Timeout:", &format!("{}ms", config.timeout));
            if config.stealth {
                output::print_check(s.ok_sym(), "Stealth:", &config.stealth_url);
            } else {
                output::print_check(s.warn_sym(), "Stealth:", "disabled");
            }
        }
        Err(e) => {
            output::print_check(s.fail_sym(), "Config:", &e.to_string());
            output::print_detail("Fix: check the PAGESIFT_* environment variables");
            ready = false;
        }
    }

    eprintln!();
    if !ready {
        bail!("environment is not ready");
    }
    eprintln!("  Status: ready");
    Ok(())
}

fn chromium_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Some(
        raw.replace("Google Chrome ", "")
            .replace("Chromium ", ""),
    )
}
