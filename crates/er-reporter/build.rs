//! Captures the compiler version for the report footer.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Cargo sets RUSTC to the compiler it invokes; fall back to PATH lookup.
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=ER_RUSTC_VERSION={version}");
}
