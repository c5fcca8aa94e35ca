use std::process;

use tvault::Vault;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("tvault-demo: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), tvault::VaultError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "demo.tvault".to_string());

    let mut vault = Vault::create(&path, "demo-password", Some("duress-password"))?;
    vault.create_folder("Work", "")?;
    vault.add_file("TODO.txt", b"- write the release notes\n".to_vec(), "Work")?;
    vault.update_file("Work/TODO.txt", b"- write the release notes\n- ship\n".to_vec())?;

    println!("wrote vault to {path}");
    println!("audit trail:");
    for entry in vault.audit_entries() {
        println!("  {} {} {}", entry.timestamp, entry.action, entry.target);
    }
    println!("audit chain verifies: {}", vault.verify_audit());

    Ok(())
}
