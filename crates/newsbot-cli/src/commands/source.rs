use anyhow::Result;

use newsbot_core::{
    feed::NewSource,
    storage::{Database, SourceRepository},
    Error,
};

pub async fn add(db: &Database, name: &str, url: &str) -> Result<()> {
    let repo = SourceRepository::new(db);
    let new_source = NewSource {
        name: name.to_string(),
        feed_url: url.to_string(),
    };

    match repo.create(&new_source).await {
        Ok(source) => println!("Added source: {} ({})", source.name, source.id),
        Err(Error::SourceExists(existing)) => println!("Source already exists: {}", existing),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub async fn list(db: &Database) -> Result<()> {
    let sources = SourceRepository::new(db).list_all().await?;

    if sources.is_empty() {
        println!("No sources yet.");
        println!("\nTo add a feed, run:");
        println!("  newsbot source add --name <name> --url <url>");
        return Ok(());
    }

    println!("Sources ({}):\n", sources.len());
    for source in &sources {
        println!("  {}", source.name);
        println!("    URL: {}", source.feed_url);
        println!("    Added: {}", source.created_at.format("%Y-%m-%d %H:%M"));
    }

    Ok(())
}

pub async fn remove(db: &Database, name: &str) -> Result<()> {
    let repo = SourceRepository::new(db);

    match repo.delete(name).await {
        Ok(()) => println!("Removed source: {}", name),
        Err(Error::SourceNotFound(_)) => {
            println!("Source '{}' not found.", name);
            let sources = repo.list_all().await?;
            if !sources.is_empty() {
                println!("\nAvailable sources:");
                for source in &sources {
                    println!("  - {}", source.name);
                }
            }
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
