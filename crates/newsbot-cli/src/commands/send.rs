use anyhow::Result;

use newsbot_core::{storage::Database, AppConfig};

use super::build_notifier;

pub async fn run(db: &Database, config: &AppConfig) -> Result<()> {
    let notifier = build_notifier(db, config)?;

    match notifier.select_and_send_article().await? {
        Some(article) => {
            println!("Posted: {}", article.title);
            println!("  {}", article.link);
        }
        None => println!("No unposted articles within the lookback window."),
    }

    Ok(())
}
