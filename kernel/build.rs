use std::{env, path::PathBuf, process::Command};

fn main() {
    let target = env::var("TARGET").expect("TARGET not set");

    let git_hash = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .unwrap_or_else(|| "0000000000000000000000000000000000000000".to_string());
    println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());

    let build_timestamp = Command::new("date")
        .args(["+%s"])
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .unwrap_or_else(|| "0".to_string());
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp.trim());

    // Default log level compiled into the kernel; override with MENTOS_LOG.
    let log_level = env::var("MENTOS_LOG").unwrap_or_else(|_| "info".to_string());
    println!("cargo:rustc-env=MENTOS_LOG_LEVEL={}", log_level);
    println!("cargo:rerun-if-env-changed=MENTOS_LOG");

    // Custom linker script for the bare-metal i686 target. Host builds
    // (used for unit tests) link against the normal host toolchain.
    if target.contains("x86") && target.contains("none") {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
        let linker_script = PathBuf::from(manifest_dir).join("src/arch/x86/link.ld");
        println!("cargo:rustc-link-arg=-T{}", linker_script.display());
        println!("cargo:rerun-if-changed=src/arch/x86/link.ld");
    }
}
