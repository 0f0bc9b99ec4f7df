//! List cases command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_cases(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let cases = store.list_all_cases().await?;

    if cases.is_empty() {
        println!("No cases are being tracked.");
        return Ok(());
    }

    println!("Tracked cases ({} total)", cases.len());
    println!("{:-<70}", "");

    for case in cases {
        let status = if case.has_status() {
            case.status.as_str()
        } else {
            "(unknown)"
        };
        let checked = case.checked_at.as_deref().unwrap_or("never");

        println!("{} {}", case.id, case.name);
        println!("  Status: {status}");
        if !case.old_status.is_empty() {
            println!("  Previous: {}", case.old_status);
        }
        println!("  Checked: {checked}");
    }

    Ok(())
}
