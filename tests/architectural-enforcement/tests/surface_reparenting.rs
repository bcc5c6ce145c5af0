//! Integration Test: Single Re-parenting Path
//!
//! **Policy**: Only the attachment controller may add the shared surface to a
//! container or remove it from one. Every other caller would bypass the
//! transition state machine and could leave the surface in two containers.
//! **Exceptions**: the trait declaration, the headless implementation, test
//! modules.

use architectural_enforcement::{code_part, rust_sources, test_module_start};

const ALLOWED_FILES: [&str; 3] = ["attachment.rs", "headless.rs", "host.rs"];

const REPARENTING_CALLS: [&str; 2] = ["add_child_surface(", "remove_child_surface("];

#[test]
fn test_only_attachment_controller_reparents_surface() {
    let mut violations = Vec::new();

    for dir in ["shell/core/src", "shell/sim/src"] {
        for (path, content) in rust_sources(dir) {
            let allowed = ALLOWED_FILES
                .iter()
                .any(|name| path.file_name().and_then(|n| n.to_str()) == Some(name));
            if allowed {
                continue;
            }

            let lines: Vec<&str> = content.lines().collect();
            let production_end = test_module_start(&lines).unwrap_or(lines.len());

            for (idx, line) in lines[..production_end].iter().enumerate() {
                let code = code_part(line);
                if REPARENTING_CALLS.iter().any(|call| code.contains(call)) {
                    violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
                }
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ Surface re-parenting outside ViewAttachmentController:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} re-parenting call(s) outside attachment.rs.\nRoute them through ViewAttachmentController::attach.",
            violations.len()
        );
    }
}

#[test]
fn test_attachment_controller_is_the_caller() {
    let sources = rust_sources("shell/core/src");
    let (_, attachment) = sources
        .iter()
        .find(|(path, _)| path.ends_with("attachment.rs"))
        .expect("attachment.rs not found");

    let lines: Vec<&str> = attachment.lines().collect();
    let production_end = test_module_start(&lines).unwrap_or(lines.len());
    let production = lines[..production_end].join("\n");

    for call in REPARENTING_CALLS {
        assert!(
            production.contains(call),
            "attachment.rs no longer calls {call}; update this test"
        );
    }
}
