//! Colored status lines for the terminal

use std::io::{self, Write};

use colored::Colorize;

pub fn info<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "::".blue().bold(), message)
}

pub fn success<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "✓".green().bold(), message.green())
}

pub fn warning<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "!".yellow().bold(), message.yellow())
}

pub fn error<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "✗".red().bold(), message.red())
}

pub fn heading<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "\n{}", message.bold())
}

/// `label: value` line with a dimmed label
pub fn field<W: Write>(out: &mut W, label: &str, value: &str) -> io::Result<()> {
    writeln!(out, "  {:<16} {}", format!("{label}:").dimmed(), value)
}
