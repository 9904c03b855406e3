use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use strum::IntoEnumIterator;

use indicatif::ProgressBar;

mod modes;
mod suite;
mod util;

use crate::modes::Mode;
use crate::suite::{generate_test_suites, ModeResult, Test};
use crate::util::add_noise;

static DEFAULT_SIGMAS: [f32; 2] = [10.0, 25.0];

// fixed seed so every mode sees the same noise
static SEED: u64 = 42;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let root = args.get(1).map(String::as_str).unwrap_or("images");
    let sigmas: Vec<f32> = if args.len() > 2 {
        args[2..].iter().filter_map(|s| s.parse().ok()).collect()
    } else {
        DEFAULT_SIGMAS.to_vec()
    };

    let mut suites = generate_test_suites(root);

    println!(
        " \x1b[1mRunning sigma sweep\x1b[0m (sigma {:?})",
        sigmas
    );

    for suite in suites.values_mut() {
        if suite.files.is_empty() {
            continue;
        }

        println!("┌──────────────────────────────────────────────────────┐");
        println!(
            "│ running tests for {suite_name: <34} │",
            suite_name = suite.name
        );
        println!("└──────────────────────────────────────────────────────┘");

        let pb = ProgressBar::new((suite.files.len() * sigmas.len()) as u64);
        for file in suite.files.iter() {
            for &sigma in &sigmas {
                pb.inc(1);
                let (results, errored) = run_test(file, sigma);
                suite.tests.push(Test {
                    name: file.to_string(),
                    sigma,
                    results,
                    errored,
                });
            }
        }
        pb.finish_and_clear()
    }

    println!("\n \x1b[1mResults\x1b[0m");

    for suite in suites.values() {
        let successful = suite.tests.iter().filter(|t| !t.errored).collect::<Vec<_>>();
        print_results(successful, &suite.name, &sigmas);
    }

    let all_tests = suites
        .values()
        .flat_map(|s| s.tests.iter())
        .filter(|t| !t.errored)
        .collect::<Vec<_>>();

    print_results(all_tests, "Overall", &sigmas);
}

fn print_results(tests: Vec<&Test>, title: &str, sigmas: &[f32]) {
    if tests.is_empty() {
        return;
    }

    println!("┌────────────────────────────────────────────┐");
    println!("│ {title: <42} │", title = title);
    println!("├─────────┬───────┬─────────┬─────────┬──────┤");
    println!("│ mode    │ sigma │  noisy  │ denoised│ time │");
    println!("├─────────┼───────┼─────────┼─────────┼──────┤");
    for mode in Mode::iter() {
        for &sigma in sigmas {
            let results: Vec<&ModeResult> = tests
                .iter()
                .filter(|t| t.sigma == sigma)
                .filter_map(|t| t.results.get(&mode))
                .collect();
            if results.is_empty() {
                continue;
            }

            let n = results.len() as f64;
            let noisy = results.iter().map(|r| r.psnr_noisy).sum::<f64>() / n;
            let denoised = results.iter().map(|r| r.psnr_denoised).sum::<f64>() / n;
            let millis: u128 = results.iter().map(|r| r.millis).sum();

            println!(
                "│ {mode: <7} │ {sigma: >5} │ {noisy: >6.2}  │ {denoised: >6.2}  │{secs: >4.1}s │",
                mode = mode.to_string(),
                secs = millis as f64 / 1000.0
            );
        }
    }
    println!("└─────────┴───────┴─────────┴─────────┴──────┘");
}

fn run_test(file: &str, sigma: f32) -> (BTreeMap<Mode, ModeResult>, bool) {
    let mut results = BTreeMap::new();
    let mut errored = false;

    for mode in Mode::iter() {
        let config = mode.config();
        let clean = match shoal::io::load(Path::new(file), config.channels) {
            Ok(clean) => clean,
            Err(e) => {
                println!("Error loading {file}, skipping: {e}");
                return (results, true);
            }
        };
        let noisy = add_noise(&clean, sigma, SEED);

        let start = Instant::now();
        let denoised = match shoal::denoise_raster(&noisy, sigma, &config) {
            Ok(denoised) => denoised,
            Err(e) => {
                println!("Error denoising {file} ({mode}), skipping: {e}");
                errored = true;
                continue;
            }
        };
        let millis = start.elapsed().as_millis();

        let (Ok(psnr_noisy), Ok(psnr_denoised)) = (
            shoal::metric::psnr(&clean, &noisy),
            shoal::metric::psnr(&clean, &denoised),
        ) else {
            errored = true;
            continue;
        };

        results.insert(
            mode,
            ModeResult {
                psnr_noisy,
                psnr_denoised,
                millis,
            },
        );
    }

    (results, errored)
}
