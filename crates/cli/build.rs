use std::process::Command;

/// Embeds `DANMU_SERVER_VERSION` as `<package version> (<short commit>)`,
/// or the bare package version outside a git checkout.
fn main() {
    let package = env!("CARGO_PKG_VERSION");
    let version = match short_commit() {
        Some(commit) => format!("{} ({})", package, commit),
        None => package.to_string(),
    };
    println!("cargo:rustc-env=DANMU_SERVER_VERSION={}", version);
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    (!commit.is_empty()).then(|| commit.to_string())
}
