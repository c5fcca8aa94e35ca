use tempfile::tempdir;
use tvault::{Vault, VaultError};

#[test]
fn create_add_and_reopen_preserves_tree_and_audit_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");

    let mut vault = Vault::create(&path, "correct horse battery staple", None).unwrap();
    vault.create_folder("Finances", "").unwrap();
    vault
        .add_file("2026-budget.csv", b"category,amount\n".to_vec(), "Finances")
        .unwrap();
    vault
        .update_file("Finances/2026-budget.csv", b"category,amount\nrent,1200\n".to_vec())
        .unwrap();

    let reopened = Vault::open(&path, "correct horse battery staple").unwrap();
    let info = reopened.resolve("Finances/2026-budget.csv").unwrap();
    assert_eq!(info.content.unwrap(), b"category,amount\nrent,1200\n");
    assert!(reopened.verify_audit());

    let actions: Vec<&str> = reopened
        .audit_entries()
        .iter()
        .map(|e| e.action.as_str())
        .collect();
    assert_eq!(
        actions,
        vec![
            "VAULT_CREATE",
            "FOLDER_CREATE",
            "FILE_CREATE",
            "FILE_EDIT",
            "VAULT_OPEN",
        ]
    );
}

#[test]
fn wrong_password_never_reveals_whether_the_vault_exists_correctly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");
    Vault::create(&path, "s3cr3t", None).unwrap();

    match Vault::open(&path, "guess") {
        Err(VaultError::Auth) => {}
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[test]
fn panic_session_never_touches_real_data_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");

    let mut real = Vault::create(&path, "real-pass", Some("duress-pass")).unwrap();
    real.create_folder("Journal", "").unwrap();
    real.add_file("entry1.txt", b"private thoughts".to_vec(), "Journal")
        .unwrap();

    let snapshot_before = std::fs::read(&path).unwrap();

    let mut duress = Vault::open(&path, "duress-pass").unwrap();
    assert!(duress.is_panic_mode());
    assert!(duress.resolve("Journal").is_err());

    duress.create_folder("Decoy", "").unwrap();
    duress
        .add_file("nothing.txt", b"nothing here".to_vec(), "Decoy")
        .unwrap();
    duress.delete_node("Decoy").ok();
    duress.save().unwrap();

    let snapshot_after = std::fs::read(&path).unwrap();
    assert_eq!(snapshot_before, snapshot_after);

    let real_again = Vault::open(&path, "real-pass").unwrap();
    let entry = real_again.resolve("Journal/entry1.txt").unwrap();
    assert_eq!(entry.content.unwrap(), b"private thoughts");
}

#[test]
fn versioning_is_capped_at_five_snapshots_per_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");
    let mut vault = Vault::create(&path, "pw", None).unwrap();
    vault.add_file("draft.md", b"v0".to_vec(), "").unwrap();

    for k in 1..=7u8 {
        std::thread::sleep(std::time::Duration::from_millis(1050));
        vault
            .update_file("draft.md", format!("v{k}").into_bytes())
            .unwrap();
    }

    let versions = vault.resolve(".versions").unwrap();
    assert_eq!(versions.children.unwrap().len(), 5);
    assert_eq!(vault.resolve("draft.md").unwrap().content.unwrap(), b"v7");
}

#[test]
fn tampering_with_the_envelope_is_detected_on_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");
    Vault::create(&path, "pw", None).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(Vault::open(&path, "pw"), Err(VaultError::Auth)));
}

#[test]
fn rename_collision_leaves_both_files_intact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");
    let mut vault = Vault::create(&path, "pw", None).unwrap();
    vault.add_file("a.txt", b"A".to_vec(), "").unwrap();
    vault.add_file("b.txt", b"B".to_vec(), "").unwrap();

    assert!(matches!(
        vault.rename_node("a.txt", "b.txt"),
        Err(VaultError::Collision(_))
    ));
    assert_eq!(vault.resolve("a.txt").unwrap().content.unwrap(), b"A");
    assert_eq!(vault.resolve("b.txt").unwrap().content.unwrap(), b"B");
}

#[test]
fn deleting_a_folder_removes_its_whole_subtree() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("personal.tvault");
    let mut vault = Vault::create(&path, "pw", None).unwrap();
    vault.create_folder("Archive", "").unwrap();
    vault
        .add_file("old.txt", b"stale".to_vec(), "Archive")
        .unwrap();

    vault.delete_node("Archive").unwrap();
    assert!(matches!(
        vault.resolve("Archive"),
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        vault.resolve("Archive/old.txt"),
        Err(VaultError::NotFound(_))
    ));
}
