//! MARKTREE_* environment overrides.
//!
//! Kept in its own test binary: it mutates the process environment. Tests in
//! here take `ENV_LOCK` since every load reads all MARKTREE_* variables.

use std::fs;
use std::sync::Mutex;

use tempfile::TempDir;

use marktree::application::ApplicationError;
use marktree::config::{local_config_path, Settings};

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn given_env_vars_when_load_then_replace_file_values() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    // Arrange
    let dir = TempDir::new().unwrap();
    let path = local_config_path(dir.path());
    fs::write(
        &path,
        r#"
node_threshold_leaf = 10
hide_from_hierarchy = ["Attachment"]
"#,
    )
    .unwrap();
    std::env::set_var("MARKTREE_NODE_THRESHOLD_LEAF", "99");
    std::env::set_var("MARKTREE_HIDE_FROM_HIERARCHY", "Folder,Redirector");
    std::env::set_var("MARKTREE_MARKING_FILTER", "Status in Published,Draft");

    // Act
    let result = Settings::load(Some(&path));
    std::env::remove_var("MARKTREE_NODE_THRESHOLD_LEAF");
    std::env::remove_var("MARKTREE_HIDE_FROM_HIERARCHY");
    std::env::remove_var("MARKTREE_MARKING_FILTER");

    // Assert
    let settings = result.expect("load settings");
    assert_eq!(settings.node_threshold_leaf, 99);
    assert_eq!(
        settings.hide_from_hierarchy,
        vec!["Folder".to_string(), "Redirector".to_string()],
        "env lists replace, they do not union"
    );
    assert_eq!(
        settings.marking_filter.as_deref(),
        Some("Status in Published,Draft"),
        "only list keys are split"
    );
}

#[test]
fn given_unparsable_number_in_env_when_load_then_config_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    // Arrange
    std::env::set_var("MARKTREE_NODE_THRESHOLD_TOTAL", "fifty");

    // Act
    let result = Settings::load(None);
    std::env::remove_var("MARKTREE_NODE_THRESHOLD_TOTAL");

    // Assert
    match result {
        Err(ApplicationError::Config { message }) => {
            assert!(message.contains("MARKTREE_NODE_THRESHOLD_TOTAL"), "{message}")
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_unparsable_bool_in_env_when_load_then_config_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    std::env::set_var("MARKTREE_LIMITING_ENABLED", "nope");

    let result = Settings::load(None);
    std::env::remove_var("MARKTREE_LIMITING_ENABLED");

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}
