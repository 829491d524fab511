use chrono::DateTime;
use gsweep::config::{self, Config};
use sqlx::Row;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <search_query>", args[0]);
        eprintln!("Search query matches against sender address, sender name or subject.");
        std::process::exit(1);
    }

    let query = &args[1];
    let search_term = format!("%{}%", query);

    let config = Config::load(config::DEFAULT_PATH)?;
    let pool = SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    let row = sqlx::query(
        "SELECT * FROM emails
         WHERE sender_email LIKE ? OR sender_name LIKE ? OR subject LIKE ?
         ORDER BY received_on DESC
         LIMIT 1",
    )
    .bind(&search_term)
    .bind(&search_term)
    .bind(&search_term)
    .fetch_optional(&pool)
    .await?;

    let Some(row) = row else {
        println!("No messages found matching '{}'", query);
        return Ok(());
    };

    let received_on: i64 = row.get("received_on");
    let received = DateTime::from_timestamp_millis(received_on)
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| received_on.to_string());

    println!("Found Message:");
    println!("ID: {}", row.get::<String, _>("id"));
    println!("Thread: {}", row.get::<String, _>("thread_id"));
    println!(
        "From: {} <{}>",
        row.get::<String, _>("sender_name"),
        row.get::<String, _>("sender_email")
    );
    println!("Subject: {}", row.get::<String, _>("subject"));
    println!("Received: {}", received);
    println!(
        "--------------------------------------------------------------------------------"
    );
    for flag in [
        "is_read",
        "is_personal",
        "is_social",
        "is_promotions",
        "is_updates",
        "is_forums",
        "is_important",
        "is_starred",
        "is_trash",
        "is_spam",
        "is_inbox",
        "is_replied",
    ] {
        println!("{:<14} {}", flag, row.get::<bool, _>(flag));
    }

    Ok(())
}
