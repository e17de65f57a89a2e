//! Manifest loading from disk.

use std::io::Write;

use twelvefactor_core::{AppManifest, NameCodec};

#[test]
fn load_manifest_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[app]
id = "acme"
name = "Acme Inc"
version = "v3"
image = "remind101/acme-inc:v3"

[[process]]
name = "web"
command = "acme-inc server"
desired_count = 1
"#
    )
    .unwrap();

    let app = AppManifest::from_file(file.path())
        .unwrap()
        .into_app()
        .unwrap();
    assert_eq!(app.name, "Acme Inc");
    assert_eq!(app.version, "v3");

    let codec = NameCodec::default();
    let names: Vec<String> = app
        .processes
        .iter()
        .map(|p| codec.encode(&app.id, &p.name))
        .collect();
    assert_eq!(names, vec!["acme--web"]);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppManifest::from_file(&dir.path().join("app.toml")).is_err());
}
