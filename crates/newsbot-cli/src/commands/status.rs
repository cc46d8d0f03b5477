use anyhow::Result;

use newsbot_core::{
    storage::{ArticleRepository, Database, SourceRepository},
    AppConfig,
};

pub async fn run(db: &Database, config: &AppConfig) -> Result<()> {
    let sources = SourceRepository::new(db).list_all().await?;
    let articles = ArticleRepository::new(db);

    println!("Database:  {}", config.database_path().display());
    println!("Sources:   {}", sources.len());
    println!("Articles:  {}", articles.count().await?);
    println!("Unposted:  {}", articles.count_unposted().await?);
    println!(
        "Channel:   {}",
        match config.telegram.channel_id {
            0 => "not set".to_string(),
            id => id.to_string(),
        }
    );

    Ok(())
}
