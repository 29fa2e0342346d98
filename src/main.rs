//! Main entry point for the nestjar CLI application.
//!
//! Resolves a locator and either prints the addressed entry, lists the
//! addressed archive, shows its manifest or lists its nested libraries.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;

use nestjar::{ArchiveHandle, Cli, ReadAt, Resolver, ResourceConnection, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level());

    let resolver = Resolver::new(cli.resolver_config());
    let locator = cli.locator_string().context("cannot resolve archive path")?;
    let mut connection = resolver.connection(&locator)?;

    run(&mut connection, &cli)?;

    // Display network transfer statistics for HTTP sources
    if cli.is_http_url() && !cli.quiet {
        let archive = connection.archive()?;
        let transferred = archive.source().reader().transferred_bytes();
        eprintln!("\nTotal bytes transferred: {}", format_size(transferred));
    }

    Ok(())
}

/// Dispatch on the CLI mode.
///
/// An entry locator is streamed to stdout unless a listing mode is
/// requested; an archive locator is listed.
fn run(connection: &mut ResourceConnection, cli: &Cli) -> Result<()> {
    if cli.manifest {
        return print_manifest(connection);
    }

    if cli.classpath {
        let prefix = &cli.library_prefix;
        let archive = connection.archive()?;
        for entry in archive.nested_archives(prefix)? {
            println!("{}", archive.entry_url(&entry.name));
        }
        return Ok(());
    }

    if connection.entry_name().is_some() && !(cli.list || cli.verbose) {
        let mut stream = connection.open_stream()?;
        let mut stdout = std::io::stdout().lock();
        std::io::copy(&mut stream, &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    let archive = Arc::clone(connection.archive()?);
    list_entries(&archive, &cli.patterns, cli.verbose)
}

fn print_manifest(connection: &mut ResourceConnection) -> Result<()> {
    let url = connection.archive()?.url();
    let manifest = connection
        .manifest()?
        .with_context(|| format!("{} has no manifest", url))?;
    for (key, value) in manifest.main_attributes().iter() {
        println!("{}: {}", key, value);
    }
    Ok(())
}

/// List entries of the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just entry names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio and timestamps
fn list_entries(archive: &ArchiveHandle, patterns: &[String], verbose: bool) -> Result<()> {
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in archive.entries() {
        let name = entry.name_lossy();
        if !patterns.is_empty() && !patterns.iter().any(|p| glob_match(p, &name)) {
            continue;
        }

        if !verbose {
            println!("{}", name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            name
        );

        // Accumulate totals (excluding directories)
        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }

    Ok(())
}

/// Compression ratio as percentage saved.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Star matches zero characters, or one and stays for more
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_patterns() {
        assert!(glob_match("lib/*.jar", "lib/x.jar"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(!glob_match("*.txt", "readme.md"));
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }
}
