use anyhow::{Context, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::PathBuf;
use tokio::fs;

/// Opens the SeaORM connection pool against the configured database.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url)
        .await
        .context("failed to connect to the database")
}

/// Applies every `.sql` script under `dir`, lowest filename first. The schema
/// lives in plain SQL files; there is no migration framework in between.
pub async fn run_migrations(conn: &DatabaseConnection, dir: &str) -> Result<()> {
    let backend = conn.get_database_backend();
    for script in sql_scripts(dir).await? {
        let sql = fs::read_to_string(&script).await?;
        // A prepared statement carries a single command, so the script is
        // split on `;` and each command sent on its own.
        for command in sql.split(';') {
            let command = command.trim();
            if command.is_empty() {
                continue;
            }
            conn.execute(Statement::from_string(backend, format!("{command};")))
                .await?;
        }
        tracing::info!(script = %script.display(), "migration applied");
    }

    Ok(())
}

async fn sql_scripts(dir: &str) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("reading migration scripts from {dir}"))?;
    let mut scripts: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "sql") {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripts_are_sql_only_and_filename_ordered() {
        let dir = std::env::temp_dir().join(format!("genwear-migrations-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        for name in ["0002_indexes.sql", "0001_init.sql", "notes.txt"] {
            fs::write(dir.join(name), "SELECT 1;").await.unwrap();
        }

        let scripts = sql_scripts(dir.to_str().unwrap()).await.unwrap();
        let names: Vec<_> = scripts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["0001_init.sql", "0002_indexes.sql"]);

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
