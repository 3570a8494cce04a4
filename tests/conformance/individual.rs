//! Fixture conformance tests - each model document is a separate test
//!
//! This test binary uses libtest-mimic to generate one test case per `.model`
//! file under `tests/fixtures`. The first directory below `tests/fixtures` names
//! the suite, which selects the enabled extensions; `manifest.json` states
//! whether a document must read cleanly and, if not, which error category the
//! failure falls into.
//!
//! Run with: cargo test --test conformance_individual
//! Run one suite: cargo test --test conformance_individual slice

#[path = "../common/mod.rs"]
mod common;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lib3mf_core::writer::write_model_xml;
use lib3mf_core::ModelReader;
use libtest_mimic::{Arguments, Failed, Trial};
use serde::Deserialize;
use walkdir::WalkDir;

const FIXTURE_DIR: &str = "tests/fixtures";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Expectation {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
struct Case {
    file: String,
    expect: Expectation,
    /// `ErrorCategory` variant name of the expected failure
    #[serde(default)]
    category: Option<String>,
    /// Number of warnings a passing read records
    #[serde(default)]
    warnings: usize,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    cases: Vec<Case>,
}

fn load_manifest() -> HashMap<String, Case> {
    let path = Path::new(FIXTURE_DIR).join("manifest.json");
    let Ok(text) = fs::read_to_string(&path) else {
        return HashMap::new();
    };
    let manifest: Manifest = match serde_json::from_str(&text) {
        Ok(manifest) => manifest,
        Err(e) => panic!("Invalid fixture manifest {}: {}", path.display(), e),
    };
    manifest
        .cases
        .into_iter()
        .map(|case| (case.file.clone(), case))
        .collect()
}

/// Every `.model` file below the fixture directory, sorted by path
fn fixture_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(FIXTURE_DIR)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("model"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Path relative to the fixture directory, with forward slashes
fn relative_name(path: &Path) -> String {
    path.strip_prefix(FIXTURE_DIR)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn run_case(path: &Path, suite: &str, case: &Case) -> Result<(), Failed> {
    let xml = fs::read_to_string(path).map_err(|e| format!("Failed to open file: {}", e))?;
    let mut reader = ModelReader::new(common::suite_config(suite));

    match (reader.read_from_str(&xml), case.expect) {
        (Ok(model), Expectation::Pass) => {
            if reader.warnings().len() != case.warnings {
                return Err(format!(
                    "Expected {} warnings, got {}: {:?}",
                    case.warnings,
                    reader.warnings().len(),
                    reader.warnings()
                )
                .into());
            }

            let mut strict = ModelReader::new(common::suite_config(suite).with_strict_mode(true));
            let strict_ok = strict.read_from_str(&xml).is_ok();
            if strict_ok != (case.warnings == 0) {
                return Err(format!(
                    "Strict mode {} with {} warnings",
                    if strict_ok { "succeeded" } else { "failed" },
                    case.warnings
                )
                .into());
            }

            let mut written = Vec::new();
            write_model_xml(&model, &mut written).map_err(|e| format!("Failed to write: {}", e))?;
            let written = String::from_utf8(written).map_err(|e| e.to_string())?;
            ModelReader::new(common::suite_config(suite))
                .read_from_str(&written)
                .map_err(|e| format!("Failed to re-read written model: {}", e))?;
            Ok(())
        }
        (Err(e), Expectation::Pass) => Err(format!("Failed to parse: {}", e).into()),
        (Ok(_), Expectation::Fail) => Err("Expected parsing to fail, but it succeeded".into()),
        (Err(e), Expectation::Fail) => match &case.category {
            Some(expected) if *expected != format!("{:?}", e.category()) => Err(format!(
                "Expected a {} error, got {:?}: {}",
                expected,
                e.category(),
                e
            )
            .into()),
            _ => Ok(()),
        },
    }
}

fn main() {
    let args = Arguments::from_args();
    let manifest = load_manifest();

    let tests: Vec<Trial> = fixture_files()
        .into_iter()
        .map(|path| {
            let name = relative_name(&path);
            let suite = name.split('/').next().unwrap_or("core").to_string();
            let case = manifest.get(&name).cloned();
            let test_name = name.replace('/', "::");
            let kind = suite_kind(&path);

            Trial::test(test_name, move || match case {
                Some(case) => run_case(&path, &suite, &case),
                None => Err(format!("{} is not listed in manifest.json", name).into()),
            })
            .with_kind(kind)
        })
        .collect();

    libtest_mimic::run(&args, tests).exit();
}

fn suite_kind(path: &Path) -> &'static str {
    match path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
        Some("core") => "core",
        Some("materials") => "materials",
        Some("production") => "production",
        Some("slice") => "slice",
        Some("beam_lattice") => "beam",
        _ => "",
    }
}
