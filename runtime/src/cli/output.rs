//! Terminal output helpers shared by the subcommands.
//!
//! Results go to stdout as JSON; human-oriented reports go to stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::IsTerminal;

/// Whether stderr reports may use ANSI colors.
pub fn color_enabled() -> bool {
    if std::env::var_os("NO_COLOR").is_some() || std::env::var_os("PAGESIFT_NO_COLOR").is_some() {
        return false;
    }
    std::io::stderr().is_terminal()
}

/// Status symbols, colored when the terminal allows it.
pub struct Styled {
    use_color: bool,
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    pub fn ok_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    pub fn fail_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    pub fn warn_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[33m\u{26a0}\x1b[0m"
        } else {
            "??"
        }
    }

    pub fn bold(&self, s: &str) -> String {
        if self.use_color {
            format!("\x1b[1m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }
}

/// Print a check result line with symbol and label/value.
pub fn print_check(symbol: &str, label: &str, value: &str) {
    eprintln!("    {symbol} {label:<16} {value}");
}

/// Print an indented detail/fix line under a check.
pub fn print_detail(msg: &str) {
    eprintln!("                        {msg}");
}

/// Serialize `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{s}");
    Ok(())
}
