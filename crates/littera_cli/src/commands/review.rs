//! `littera review add|list|delete`.

use crate::cli::ReviewCommands;
use crate::commands::support::{
    parse_pairs, require_work, resolve_block_global, resolve_document, resolve_entity,
    resolve_section_global,
};
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::model::derived::{Review, ReviewScope, ReviewSeverity};
use littera_core::repo::review_repo::{PgReviewRepository, ReviewRepository};
use postgres::Client;
use uuid::Uuid;

pub fn run(ctx: &OutputCtx, command: ReviewCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        ReviewCommands::Add {
            description,
            scope,
            scope_id,
            issue_type,
            severity,
            metadata,
        } => {
            let work = require_work(client)?;
            let severity = ReviewSeverity::parse(&severity)?;

            if scope_id.is_some() && scope.is_none() {
                return Err(CliError::invalid("--scope-id requires --scope"));
            }
            let scope = scope.map(|value| ReviewScope::parse(&value)).transpose()?;
            let scope_id = match (&scope, scope_id) {
                (Some(scope), Some(selector)) => {
                    Some(resolve_scope_id(client, *scope, &selector)?)
                }
                (Some(ReviewScope::Work), None) => Some(work.id),
                _ => None,
            };

            let mut review = Review::new(work.id, description.clone());
            review.scope = scope;
            review.scope_id = scope_id;
            review.issue_type = issue_type;
            review.severity = severity;
            review.metadata = parse_pairs(&metadata)?;

            if ctx.dry_run {
                println!("Would add review: {description}");
                return Ok(());
            }

            let id = PgReviewRepository::new(client).create_review(&review)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "id": id }));
            } else {
                println!("✓ Review added ({})", review.severity.as_db());
            }
            Ok(())
        }

        ReviewCommands::List => {
            let work = require_work(client)?;
            let reviews = PgReviewRepository::new(client).list_reviews(work.id)?;
            if ctx.json {
                ctx.emit_json(&reviews);
                return Ok(());
            }
            if reviews.is_empty() {
                println!("No reviews yet.");
                return Ok(());
            }
            println!("Reviews:");
            for (index, review) in reviews.iter().enumerate() {
                let scope = review
                    .scope
                    .map(|scope| format!(" [{}]", scope.as_db()))
                    .unwrap_or_default();
                println!(
                    "[{}] ({}){} {}",
                    index + 1,
                    review.severity.as_db(),
                    scope,
                    review.description
                );
            }
            Ok(())
        }

        ReviewCommands::Delete { selector } => {
            let review = resolve_review(client, &selector)?;
            if ctx.dry_run {
                println!("Would delete review {}", review.0);
                return Ok(());
            }
            PgReviewRepository::new(client).delete_review(review.0)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "deleted": review.0 }));
            } else {
                println!("✓ Review deleted: {}", review.1);
            }
            Ok(())
        }
    }
}

fn resolve_scope_id(client: &mut Client, scope: ReviewScope, selector: &str) -> CliResult<Uuid> {
    match scope {
        ReviewScope::Work => {
            let work = require_work(client)?;
            if selector == work.id.to_string() {
                Ok(work.id)
            } else {
                Err(CliError::not_found(format!("work not found: {selector}")))
            }
        }
        ReviewScope::Document => Ok(resolve_document(client, selector)?.id),
        ReviewScope::Section => Ok(resolve_section_global(client, selector)?.id),
        ReviewScope::Block => Ok(resolve_block_global(client, selector)?.id),
        ReviewScope::Entity => Ok(resolve_entity(client, selector)?.id),
        ReviewScope::Alignment => Uuid::parse_str(selector)
            .map_err(|_| CliError::invalid(format!("invalid alignment id: {selector}"))),
    }
}

fn resolve_review(client: &mut Client, selector: &str) -> CliResult<(Uuid, String)> {
    let work = require_work(client)?;
    let reviews = PgReviewRepository::new(client).list_reviews(work.id)?;

    if let Ok(index) = selector.parse::<usize>() {
        if index >= 1 && index <= reviews.len() {
            let review = &reviews[index - 1];
            return Ok((review.id, review.description.clone()));
        }
        return Err(CliError::invalid(format!(
            "invalid review index: {selector} (have {})",
            reviews.len()
        )));
    }

    if let Ok(id) = Uuid::parse_str(selector) {
        if let Some(review) = reviews.iter().find(|review| review.id == id) {
            return Ok((review.id, review.description.clone()));
        }
    }
    Err(CliError::not_found(format!("review not found: {selector}")))
}
