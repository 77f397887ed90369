//! Document-source management commands.
//!
//! CLI counterparts of the `/documents` endpoints: list the distinct
//! source files currently indexed, and delete one source or the whole
//! knowledge base. Deletion is idempotent; removing a file that was never
//! indexed reports zero chunks removed and succeeds.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

pub async fn run_sources(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), config.embedding.dims);

    let sources = store.list_sources().await?;
    if sources.is_empty() {
        println!("No documents indexed.");
    } else {
        for source in &sources {
            println!("{}", source);
        }
    }

    pool.close().await;
    Ok(())
}

pub async fn run_delete(config: &Config, file_name: Option<String>, all: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), config.embedding.dims);

    if all {
        store.delete_all().await?;
        println!("Knowledge base cleared.");
    } else {
        let file_name =
            file_name.ok_or_else(|| anyhow::anyhow!("provide a file name or use --all"))?;
        let deleted = store.delete_by_source(&file_name).await?;
        println!("delete {}", file_name);
        println!("  chunks removed: {}", deleted);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
