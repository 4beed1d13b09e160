//! Version banner built from VERSION and BUILD files

use std::path::Path;
use tokio::fs;

const DEVELOPMENT: &str = "development";

/// `<version>-<build>`, or `development` when either file is missing
pub async fn version_string(dir: &Path) -> String {
    let version = fs::read_to_string(dir.join("VERSION")).await;
    let build = fs::read_to_string(dir.join("BUILD")).await;

    match (version, build) {
        (Ok(version), Ok(build)) => format!("{}-{}", flatten(&version), flatten(&build)),
        _ => DEVELOPMENT.to_string(),
    }
}

/// Line breaks become spaces, surrounding whitespace is dropped
fn flatten(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ").trim().to_string()
}
