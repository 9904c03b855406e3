use std::collections::BTreeMap;
use walkdir::WalkDir;

use crate::{
    modes::Mode,
    util::{is_image, to_dir},
};

#[derive(Debug)]
pub struct ModeResult {
    pub psnr_noisy: f64,
    pub psnr_denoised: f64,
    pub millis: u128,
}

#[derive(Debug)]
pub struct Test {
    pub name: String,
    pub sigma: f32,
    pub results: BTreeMap<Mode, ModeResult>,
    pub errored: bool,
}

#[derive(Debug)]
pub struct TestSuite {
    pub name: String,
    pub files: Vec<String>,
    pub tests: Vec<Test>,
}

pub fn generate_test_suites(root: &str) -> BTreeMap<String, TestSuite> {
    let mut suites: BTreeMap<String, TestSuite> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else {
            continue;
        };

        let Some(path) = entry.path().to_str() else {
            continue;
        };

        if entry.file_type().is_dir() {
            suites.insert(
                path.to_string(),
                TestSuite {
                    name: path.to_string(),
                    files: Vec::new(),
                    tests: Vec::new(),
                },
            );
            continue;
        }

        if !is_image(path) {
            continue;
        }

        let Some(suite) = suites.get_mut(&to_dir(path)) else {
            println!("No suite for {}", path);
            continue;
        };

        suite.files.push(path.to_string());
    }
    suites
}
