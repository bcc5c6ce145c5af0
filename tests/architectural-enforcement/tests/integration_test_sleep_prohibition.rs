//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT block a thread with `std::thread::sleep`.
//! Settle delays and frame pacing run on the tokio timer (`tokio::time::sleep`)
//! so they never stall the runtime and can be driven by paused time in tests.
//! **Exceptions**: test modules.

use architectural_enforcement::{code_part, rust_sources, test_module_start};

const PRODUCTION_DIRS: [&str; 2] = ["shell/core/src", "shell/sim/src"];

/// Test that production code does not contain blocking sleep calls
#[test]
fn test_no_blocking_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use tokio::time::sleep with a constant from shell/core/src/timing.rs");

        panic!(
            "\nFound {} blocking sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Test that the scan actually sees the core crate
#[test]
fn test_sleep_scan_covers_core() {
    let sources = rust_sources("shell/core/src");
    assert!(
        sources.iter().any(|(path, _)| path.ends_with("timing.rs")),
        "core sources not found; is the workspace layout unchanged?"
    );
}

fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for (path, content) in rust_sources(dir) {
            let lines: Vec<&str> = content.lines().collect();
            let production_end = test_module_start(&lines).unwrap_or(lines.len());

            for (idx, line) in lines[..production_end].iter().enumerate() {
                let code = code_part(line);
                if code.contains("thread::sleep(") || code.contains("std::thread::sleep") {
                    violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
                }
            }
        }
    }

    violations
}
