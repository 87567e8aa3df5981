//! `engage-cli db` subcommands.

use anyhow::Result;

pub async fn db_status() -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let s = engage_store::status(&pool).await?;
    println!("db_ok={} has_companies_table={}", s.ok, s.has_companies_table);
    Ok(())
}

pub async fn db_migrate() -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    engage_store::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(())
}
