use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_users(config: &Config, with_cases: bool) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let count = store.case_count_for_user(user.id).await?;
        println!("{} <{}> | {} cases | since {}", user.username, user.email, count, user.created_at);

        if with_cases {
            for case in store.list_cases_for_user(user.id).await? {
                println!("  {} {}", case.id, case.display_name());
            }
        }
    }

    Ok(())
}
