//! Terminal output for the arkabc CLI.
//!
//! Everything the commands print goes through here, styled with
//! [`console`]. Timings are shown in milliseconds and artifacts by a short
//! SHA-256 fingerprint, so two runs can be compared by eye.

use std::time::Duration;

use console::style;
use sha2::{Digest, Sha256};

/// Command title, underlined to its own width.
pub fn print_header(text: &str) {
    println!("\n{}", style(text).bold().cyan());
    println!("{}", style("=".repeat(text.len())).dim());
}

/// A finished outcome: a verified proof, a written file, a complete tree.
pub fn print_success(text: &str) {
    println!("{} {}", style("[OK]").green().bold(), text);
}

/// Something finished short of what was asked, e.g. a curve chain that ran
/// out before one root was left.
pub fn print_warning(text: &str) {
    println!("{} {}", style("[WARN]").yellow().bold(), text);
}

/// Pipeline progress, `[2/4] Generating circuit keys...`.
pub fn print_step(step: u32, total: u32, text: &str) {
    println!("{} {}", style(format!("[{step}/{total}]")).dim(), text);
}

pub fn print_key_value(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// One stage timing line; stages that never ran print `-`.
pub fn print_timing(label: &str, nanos: Option<u64>) {
    print_key_value(label, &format_nanos(nanos));
}

/// A stored artifact: its name, fingerprint and size.
pub fn print_artifact(name: &str, bytes: &[u8]) {
    print_key_value(
        name,
        &format!("{} ({} bytes)", fingerprint(bytes), bytes.len()),
    );
}

/// Milliseconds with three decimals, or `-` when the stage never ran.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{:.3} ms", d.as_secs_f64() * 1e3),
        None => "-".to_string(),
    }
}

pub fn format_nanos(nanos: Option<u64>) -> String {
    format_duration(nanos.map(Duration::from_nanos))
}

/// First eight bytes of SHA-256 over `bytes`, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}
