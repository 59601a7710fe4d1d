fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let git_hash = std::process::Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

    if let Some(h) = git_hash {
        println!("cargo:rustc-env=POLL_SERVICE_BUILD_GIT_HASH={}", h);
    }

    // SOURCE_DATE_EPOCH wins for reproducible builds
    let now = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            let ts = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
            Some(ts.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=POLL_SERVICE_BUILD_TIME_UNIX={}", now);
}
