// Startup module - banner printed before replay begins
//
// Shows what is about to happen: which archive, how many entries, at what
// velocity, across how many workers, with how many transforms. Printed to
// stdout before any replay traffic starts flowing.

use crate::config::{Config, VERSION};
use crate::har::Har;

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Print the startup banner.
pub fn print_startup(config: &Config, archive: &Har, transform_count: usize) {
    use colors::*;

    // Banner
    println!();
    println!("  {BOLD}{CYAN}harrier{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}HTTP session replay{RESET}");
    println!();

    // Config file status
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} Archive {BOLD}{}{RESET} {DIM}({} entries){RESET}",
        archive.name,
        archive.entries.len()
    );
    println!(
        "  {MAGENTA}▸{RESET} Velocity {BOLD}{}{RESET}, {BOLD}{}{RESET} worker(s), {BOLD}{}{RESET} transform(s)",
        config.velocity, config.workers, transform_count
    );
    println!();
}

/// Mirror the banner into the log stream for headless runs captured to files.
pub fn log_startup(config: &Config, archive: &Har, transform_count: usize) {
    tracing::info!("harrier v{}", VERSION);
    tracing::info!(
        archive = %archive.name,
        entries = archive.entries.len(),
        velocity = config.velocity,
        workers = config.workers,
        transforms = transform_count,
        "replay configured"
    );
}
