use std::path::Path;
use std::process::Command;

/// Commit of the build: `SOURCE_COMMIT_SHA` from CI if set, else `git rev-parse`.
fn commit_hash() -> Option<String> {
    if let Ok(sha) = std::env::var("SOURCE_COMMIT_SHA") {
        return Some(sha);
    }
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

fn main() {
    // sqlx::migrate! embeds this directory.
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-env-changed=SOURCE_COMMIT_SHA");

    let hash = commit_hash().unwrap_or_else(|| "unknown".to_owned());
    let short = hash.get(..7).unwrap_or(&hash);

    println!("cargo:rustc-env=GIT_COMMIT_HASH={hash}");
    println!("cargo:rustc-env=GIT_COMMIT_SHORT={short}");

    if Path::new(".git/HEAD").exists() {
        println!("cargo:rerun-if-changed=.git/HEAD");
        println!("cargo:rerun-if-changed=.git/refs/heads");
    }
}
