/*
 * cli.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for the embedmap binary.
 */

//! Integration tests for the embedmap binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

const HOST: &str = "<script lang=\"civet\">\nx := 1\n</script>\n";

fn embedmap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_embedmap"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run embedmap")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is UTF-8")
}

#[test]
fn test_normalize_writes_map() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let host = temp.path().join("App.svelte");
    let code = temp.path().join("App.ts");
    let native = temp.path().join("App.native.json");
    let output = temp.path().join("App.map");
    fs::write(&host, HOST).unwrap();
    fs::write(&code, "const x = 1\n").unwrap();
    fs::write(&native, r#"{"lines": [[[0, 0, 0, 0], [6, 0, 0, 0], [4, 0, 0, 5]]]}"#).unwrap();

    let out = embedmap(&[
        "normalize",
        "--host",
        path_str(&host),
        "--code",
        path_str(&code),
        "--native-map",
        path_str(&native),
        "--start-line",
        "2",
        "-o",
        path_str(&output),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let map: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["mappings"], "AACA,MAAA,IAAK");
    assert_eq!(map["sourcesContent"][0], HOST);
}

#[test]
fn test_normalize_reports_bad_native_map() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let host = temp.path().join("App.svelte");
    let code = temp.path().join("App.ts");
    let native = temp.path().join("App.native.json");
    fs::write(&host, HOST).unwrap();
    fs::write(&code, "const x = 1\n").unwrap();
    fs::write(&native, r#"{"names": []}"#).unwrap();

    let out = embedmap(&[
        "normalize",
        "--host",
        path_str(&host),
        "--code",
        path_str(&code),
        "--native-map",
        path_str(&native),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to parse native map"));
}

#[test]
fn test_lookup() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let map = temp.path().join("App.map");
    fs::write(
        &map,
        r#"{"version":3,"file":"App.svelte","sources":["App.svelte"],"names":["x"],"mappings":"AACA,MAAAA"}"#,
    )
    .unwrap();

    let out = embedmap(&["lookup", "--map", path_str(&map), "--line", "1", "--column", "8"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let position: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(position["line"], 2);
    assert_eq!(position["column"], 0);
    assert_eq!(position["name"], "x");

    let out = embedmap(&["lookup", "--map", path_str(&map), "--line", "4", "--column", "0"]);
    assert!(!out.status.success());
}

#[cfg(unix)]
#[test]
fn test_preprocess_with_bridge_command() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let input = temp.path().join("App.svelte");
    let out_dir = temp.path().join("out");
    fs::write(&input, HOST).unwrap();

    let script = r#"cat > /dev/null; printf '{"code": "const x = 1\\n", "sourceMap": {"lines": [[[0, 0, 0, 0]]]}}'"#;
    let out = embedmap(&[
        "preprocess",
        path_str(&input),
        "--compiler",
        "sh",
        "--compiler-arg=-c",
        &format!("--compiler-arg={}", script),
        "--out-dir",
        path_str(&out_dir),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let code = fs::read_to_string(out_dir.join("App.ts.svelte")).unwrap();
    assert_eq!(code, "<script lang=\"ts\">\nconst x = 1\n</script>\n");
    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("App.ts.svelte.instance.map")).unwrap())
            .unwrap();
    assert_eq!(map["mappings"], "AACA");
}

#[test]
fn test_preprocess_with_missing_compiler_passes_through() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let input = temp.path().join("App.svelte");
    fs::write(&input, HOST).unwrap();

    let out = embedmap(&[
        "preprocess",
        path_str(&input),
        "--compiler",
        "embedmap-test-no-such-compiler",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("M-4-1"));
    let code = fs::read_to_string(temp.path().join("App.ts.svelte")).unwrap();
    assert_eq!(code, HOST);
}
