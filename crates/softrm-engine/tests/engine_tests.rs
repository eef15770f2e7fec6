use std::fs;
use std::path::{Path, PathBuf};

use softrm_core::BinConfig;
use softrm_engine::{Disposal, EngineError, InteractiveMode, RemovalEngine, RemovalOptions};
use softrm_store::RecycleStore;

fn yes(_: &str) -> bool {
    true
}

fn no(_: &str) -> bool {
    false
}

fn store_at(dir: &Path) -> RecycleStore {
    RecycleStore::open(&BinConfig::new(dir.join("bin"))).unwrap()
}

#[test]
fn test_permanent_removal_of_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("a.txt");
    fs::write(&victim, b"bytes").unwrap();

    let mut yes = yes;
    let mut engine = RemovalEngine::new(RemovalOptions::default(), None, &mut yes);
    let report = engine.remove_all(&[victim.clone()]).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.succeeded, 1);
    assert!(!victim.exists());
}

#[test]
fn test_recycled_removal_of_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path());
    let victim = dir.path().join("a.txt");
    fs::write(&victim, b"bytes").unwrap();

    let mut yes = yes;
    let mut engine = RemovalEngine::new(RemovalOptions::default(), Some(&store), &mut yes);
    let report = engine.remove_all(&[victim.clone()]).unwrap();

    assert!(report.is_clean());
    assert!(!victim.exists());
    assert_eq!(store.entries().unwrap().count(), 1);
}

#[test]
fn test_missing_target_fails_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let ghost = dir.path().join("ghost.txt");

    let mut yes = yes;
    let mut engine = RemovalEngine::new(RemovalOptions::default(), None, &mut yes);
    let report = engine.remove_all(&[ghost.clone()]).unwrap();

    assert_eq!(report.failed, 1);
    assert!(matches!(
        report.errors[0].1,
        EngineError::NotFound { .. }
    ));
}

#[test]
fn test_missing_target_silent_under_force() {
    let dir = tempfile::tempdir().unwrap();
    let ghost = dir.path().join("ghost.txt");

    let options = RemovalOptions::builder().force(true).build().unwrap();
    let mut yes = yes;
    let mut engine = RemovalEngine::new(options, None, &mut yes);
    let report = engine.remove_all(&[ghost]).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.succeeded, 1);
    assert!(report.errors.is_empty());
}

#[test]
fn test_remaining_targets_continue_after_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ghost = dir.path().join("ghost.txt");
    let real = dir.path().join("real.txt");
    fs::write(&real, b"bytes").unwrap();

    let mut yes = yes;
    let mut engine = RemovalEngine::new(RemovalOptions::default(), None, &mut yes);
    let report = engine.remove_all(&[ghost, real.clone()]).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(!real.exists());
}

#[test]
fn test_directory_requires_recursive_or_dir_mode() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("dir");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("inner.txt"), b"x").unwrap();

    let mut yes = yes;
    let mut engine = RemovalEngine::new(RemovalOptions::default(), None, &mut yes);
    let report = engine.remove_all(&[target.clone()]).unwrap();

    assert_eq!(report.failed, 1);
    assert!(matches!(
        report.errors[0].1,
        EngineError::IsADirectory { .. }
    ));
    // Untouched.
    assert!(target.join("inner.txt").exists());
}

#[test]
fn test_dir_mode_removes_only_empty_directories() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty");
    let full = dir.path().join("full");
    fs::create_dir(&empty).unwrap();
    fs::create_dir(&full).unwrap();
    fs::write(full.join("inner.txt"), b"x").unwrap();

    let options = RemovalOptions::builder().dir_mode(true).build().unwrap();
    let mut yes = yes;
    let mut engine = RemovalEngine::new(options, None, &mut yes);
    let report = engine
        .remove_all(&[empty.clone(), full.clone()])
        .unwrap();

    assert!(!empty.exists());
    assert!(full.exists());
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(matches!(
        report.errors[0].1,
        EngineError::DirectoryNotEmpty { .. }
    ));
}

#[test]
fn test_recursive_permanent_removes_whole_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("a/deep")).unwrap();
    fs::write(root.join("a/deep/leaf.txt"), b"x").unwrap();
    fs::write(root.join("top.txt"), b"x").unwrap();

    let options = RemovalOptions::builder().recursive(true).build().unwrap();
    let mut yes = yes;
    let mut engine = RemovalEngine::new(options, None, &mut yes);
    let report = engine.remove_all(&[root.clone()]).unwrap();

    assert!(report.is_clean());
    assert!(!root.exists());
}

#[test]
fn test_recursive_recycle_interns_tree_as_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path());
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("sub/leaf.txt"), b"x").unwrap();
    fs::write(root.join("top.txt"), b"x").unwrap();

    let options = RemovalOptions::builder().recursive(true).build().unwrap();
    let mut yes = yes;
    let mut engine = RemovalEngine::new(options, Some(&store), &mut yes);
    let report = engine.remove_all(&[root.clone()]).unwrap();

    assert!(report.is_clean());
    assert!(!root.exists());

    let entries: Vec<_> = store.entries().unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_directory);
    assert!(!entries[0].is_compressed);
}

#[test]
fn test_denied_prompt_skips_single_node_only() {
    let dir = tempfile::tempdir().unwrap();
    let keep = dir.path().join("keep.txt");
    let drop = dir.path().join("drop.txt");
    fs::write(&keep, b"keep").unwrap();
    fs::write(&drop, b"drop").unwrap();

    let options = RemovalOptions::builder()
        .interactive(InteractiveMode::Always)
        .build()
        .unwrap();
    let mut oracle = |prompt: &str| !prompt.contains("keep.txt");
    let mut engine = RemovalEngine::new(options, None, &mut oracle);
    let report = engine.remove_all(&[keep.clone(), drop.clone()]).unwrap();

    // A denied prompt is a skip, not a failure; the run stays clean.
    assert!(report.is_clean());
    assert_eq!(report.skipped, 1);
    assert!(keep.exists());
    assert!(!drop.exists());
}

#[test]
fn test_denied_directory_inside_recursive_walk_keeps_node_only() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("sub/leaf.txt"), b"x").unwrap();
    fs::write(root.join("top.txt"), b"x").unwrap();

    let options = RemovalOptions::builder()
        .recursive(true)
        .interactive(InteractiveMode::Always)
        .build()
        .unwrap();
    // Accept everything except directory-removal prompts inside the walk.
    let mut oracle = |prompt: &str| !prompt.contains("remove directory");
    let mut engine = RemovalEngine::new(options, None, &mut oracle);
    let report = engine.remove_all(&[root.clone()]).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.skipped, 1);
    // Files are gone; the skipped directory (and therefore the root holding
    // it) survives.
    assert!(!root.join("sub/leaf.txt").exists());
    assert!(!root.join("top.txt").exists());
    assert!(root.join("sub").exists());
    assert!(root.exists());
}

#[test]
fn test_batch_gate_denial_aborts_before_any_disposal() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("file.txt"), b"x").unwrap();

    let options = RemovalOptions::builder()
        .recursive(true)
        .interactive(InteractiveMode::Once)
        .build()
        .unwrap();
    let mut no = no;
    let mut engine = RemovalEngine::new(options, None, &mut no);
    let report = engine.remove_all(&[root.clone()]).unwrap();

    assert!(report.aborted);
    assert_eq!(report.succeeded + report.failed, 0);
    assert!(root.join("file.txt").exists());
}

#[test]
fn test_batch_gate_accepted_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("file.txt"), b"x").unwrap();

    let options = RemovalOptions::builder()
        .recursive(true)
        .interactive(InteractiveMode::Once)
        .build()
        .unwrap();
    let mut yes = yes;
    let mut engine = RemovalEngine::new(options, None, &mut yes);
    let report = engine.remove_all(&[root.clone()]).unwrap();

    assert!(!report.aborted);
    assert!(report.is_clean());
    assert!(!root.exists());
}

#[test]
fn test_root_protection_rejects_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let fine = dir.path().join("fine.txt");
    fs::write(&fine, b"x").unwrap();

    let options = RemovalOptions::builder().recursive(true).build().unwrap();
    let mut yes = yes;
    let mut engine = RemovalEngine::new(options, None, &mut yes);
    let err = engine
        .remove_all(&[fine.clone(), PathBuf::from("/")])
        .unwrap_err();

    assert!(matches!(err, EngineError::RootProtected));
    assert!(err.is_protection());
    // Nothing was disposed, the valid target included.
    assert!(fine.exists());
}

#[test]
fn test_dot_target_rejects_whole_batch() {
    let mut yes = yes;
    let mut engine = RemovalEngine::new(RemovalOptions::default(), None, &mut yes);
    let err = engine.remove_all(&[PathBuf::from(".")]).unwrap_err();
    assert!(matches!(err, EngineError::DotComponent { .. }));
}

#[cfg(unix)]
#[test]
fn test_write_protected_file_prompts_on_tty() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("protected.txt");
    fs::write(&victim, b"x").unwrap();
    fs::set_permissions(&victim, fs::Permissions::from_mode(0o444)).unwrap();

    let options = RemovalOptions::builder().tty(true).build().unwrap();
    let mut prompts = Vec::new();
    let mut oracle = |prompt: &str| {
        prompts.push(prompt.to_string());
        false
    };
    let mut engine = RemovalEngine::new(options, None, &mut oracle);
    let report = engine.remove_all(&[victim.clone()]).unwrap();

    assert_eq!(report.skipped, 1);
    assert!(victim.exists());
    drop(engine);
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("write-protected regular file"));
}

#[test]
fn test_observer_sees_each_disposal() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, b"x").unwrap();
    fs::write(&b, b"x").unwrap();

    let mut seen: Vec<(PathBuf, Disposal)> = Vec::new();
    let mut observer = |path: &Path, disposal: Disposal| {
        seen.push((path.to_path_buf(), disposal));
    };
    let mut yes = yes;
    let mut engine =
        RemovalEngine::new(RemovalOptions::default(), None, &mut yes).with_observer(&mut observer);
    engine.remove_all(&[a.clone(), b.clone()]).unwrap();

    drop(engine);
    assert_eq!(
        seen,
        vec![(a, Disposal::Removed), (b, Disposal::Removed)]
    );
}

#[test]
fn test_targets_disposed_in_command_line_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("zz_first.txt");
    let second = dir.path().join("aa_second.txt");
    fs::write(&first, b"1").unwrap();
    fs::write(&second, b"2").unwrap();

    let mut seen: Vec<PathBuf> = Vec::new();
    let mut observer = |path: &Path, _: Disposal| seen.push(path.to_path_buf());
    let mut yes = yes;
    let mut engine =
        RemovalEngine::new(RemovalOptions::default(), None, &mut yes).with_observer(&mut observer);
    engine.remove_all(&[first.clone(), second.clone()]).unwrap();

    drop(engine);
    assert_eq!(seen, vec![first, second]);
}
