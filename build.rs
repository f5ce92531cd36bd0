use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    String::from_utf8(out.stdout).ok().map(|s| s.trim().to_string())
}

fn main() {
    // Re-run if git state changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let pkg_version = env!("CARGO_PKG_VERSION");

    // A commit tagged with the package version is a release build
    let tagged = git(&["tag", "--points-at", "HEAD"])
        .map(|tags| {
            tags.lines()
                .any(|t| t.trim().trim_start_matches('v') == pkg_version)
        })
        .unwrap_or(false);

    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_default();

    let long_version = if tagged || commit.is_empty() {
        pkg_version.to_string()
    } else {
        let dirty = git(&["status", "--porcelain"])
            .map(|s| !s.is_empty())
            .unwrap_or(false);
        if dirty {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            format!("{pkg_version}-{commit}-{timestamp}")
        } else {
            format!("{pkg_version}-{commit}")
        }
    };

    println!("cargo:rustc-env=SETUP_SCCACHE_LONG_VERSION={long_version}");
}
