//! `littera status`: cluster state and content counts.

use crate::commands::support::require_work;
use crate::output::{CliResult, OutputCtx};
use littera_core::db::{lease, open_work_db};
use littera_core::resources::ResourceSurface;

pub fn run(ctx: &OutputCtx) -> CliResult<()> {
    let mut db = open_work_db()?;
    let work = require_work(db.client())?;
    let started = db.started_here();
    let lease_left = lease::remaining(&db.littera_dir);

    let status = ResourceSurface::new(&mut db).status()?;
    let log_dir = littera_core::log_directory();

    if ctx.json {
        ctx.emit_json(&serde_json::json!({
            "work_id": work.id,
            "title": work.title,
            "port": status.port,
            "started_here": started,
            "lease_seconds_left": lease_left,
            "log_dir": log_dir.as_ref().map(|dir| dir.display().to_string()),
            "documents": status.documents,
            "sections": status.sections,
            "blocks": status.blocks,
            "entities": status.entities,
        }));
        return Ok(());
    }

    println!(
        "Littera work: {}\n",
        work.title.as_deref().unwrap_or("Untitled")
    );
    println!("Database:");
    let started_text = if started { "started" } else { "already running" };
    println!(
        "  ✓ Embedded Postgres available ({started_text}, port {})",
        status.port
    );
    println!("  ✓ Database: {}", db.config.postgres.db_name);
    match lease_left {
        Some(seconds) => println!("  ✓ Lease: expires in {seconds}s"),
        None => println!("  ✓ Lease: none"),
    }
    if let Some(dir) = log_dir {
        println!("  ✓ Logs: {}", dir.display());
    }

    println!("\nContent:");
    println!("  • Documents: {}", status.documents);
    println!("  • Sections:  {}", status.sections);
    println!("  • Blocks:    {}", status.blocks);
    println!("  • Entities:  {}", status.entities);
    Ok(())
}
