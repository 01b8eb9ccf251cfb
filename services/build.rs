use std::process::Command;

fn main() {
    println!(
        "cargo:rustc-env=BUILD_DATE={}",
        chrono::Utc::now().to_rfc3339()
    );

    let commit = git(&["rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=BUILD_COMMIT={commit}");

    let branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]);
    println!("cargo:rustc-env=BUILD_BRANCH={branch}");

    println!("cargo:rerun-if-changed=../.git/HEAD");
}

/// Runs a git query, falling back to `unknown` outside a checkout.
fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}
