//! Build script for flora-id
//!
//! Exposes to the crate:
//! - `GIT_HASH`: short commit of the source tree, or `unknown` outside git
//! - `BUILD_TIMESTAMP`: local time of the build
//! - `BUILD_PROFILE`: cargo profile
//! - `BUILD_BACKEND`: `onnx` when the local classifier is compiled in, else `cloud-only`

use std::env;
use std::process::Command;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    let backend = if env::var_os("CARGO_FEATURE_ONNX").is_some() {
        "onnx"
    } else {
        "cloud-only"
    };

    let stamps = [
        ("GIT_HASH", git_short_hash().unwrap_or_else(|| "unknown".to_string())),
        (
            "BUILD_TIMESTAMP",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string(),
        ),
        (
            "BUILD_PROFILE",
            env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
        ),
        ("BUILD_BACKEND", backend.to_string()),
    ];

    for (key, value) in stamps {
        println!("cargo:rustc-env={}={}", key, value);
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
