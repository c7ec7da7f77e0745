//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `latchlist_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("latchlist_core version={}", latchlist_core::core_version());
}
