use std::env;
use std::process::Command;

// Version details shown by `svnscm --version`
fn main() {
    let revision = source_revision();
    let build_date = chrono::Utc::now().format("%Y-%m-%d");

    println!("cargo:rustc-env=GIT_HASH={revision}");
    println!("cargo:rustc-env=BUILD_DATE={build_date}");
    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

fn source_revision() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
