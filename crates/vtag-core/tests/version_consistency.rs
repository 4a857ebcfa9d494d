//! Ensures all workspace crates use `version.workspace = true`, and that the
//! manifest reader resolves this crate's own version the way Cargo does.

use std::path::{Path, PathBuf};

use vtag_core::manifest;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

#[test]
fn all_crates_use_workspace_version() {
    let root = workspace_root();

    for krate in ["crates/vtag-core", "crates/vtag-ci", "crates/vtag-cli"] {
        let toml_str = std::fs::read_to_string(root.join(krate).join("Cargo.toml")).unwrap();
        let doc: toml::Table = toml_str.parse().unwrap();
        let inherited = doc["package"]["version"]
            .as_table()
            .and_then(|t| t.get("workspace"))
            .and_then(|v| v.as_bool());
        assert_eq!(
            inherited,
            Some(true),
            "{} should use version.workspace = true",
            krate
        );
    }
}

#[test]
fn manifest_reader_matches_cargo_pkg_version() {
    let own = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let version = manifest::read_version(&own).unwrap();
    assert_eq!(version.as_str(), env!("CARGO_PKG_VERSION"));
    assert_eq!(
        version.tag_name().as_str(),
        format!("v{}", env!("CARGO_PKG_VERSION"))
    );
}
