//! `littera inflect`: surface-form preview, no database access.

use crate::cli::InflectArgs;
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::linguistics;
use littera_core::model::meta::{MetaMap, MetaValue};

pub fn run(ctx: &OutputCtx, args: InflectArgs) -> CliResult<()> {
    // Language-specific flag conflicts mirror the feature vocabularies.
    if args.lang == "pl" {
        if args.possessive {
            return Err(CliError::invalid(
                "--possessive is English only; use --case gen for the Polish genitive",
            ));
        }
        if args.article.is_some() {
            return Err(CliError::invalid(
                "--article is English only; Polish has no articles",
            ));
        }
    }
    if args.possessive && args.case.is_some() {
        return Err(CliError::invalid(
            "--possessive and --case are mutually exclusive",
        ));
    }

    let mut features = MetaMap::new();
    if args.plural {
        features.insert("number".into(), MetaValue::from("pl"));
    }
    if args.possessive {
        features.insert("case".into(), MetaValue::from("poss"));
    } else if let Some(case) = &args.case {
        features.insert("case".into(), MetaValue::from(case.as_str()));
    }
    if let Some(article) = &args.article {
        if article != "a" && article != "the" {
            return Err(CliError::invalid(format!(
                "invalid article: {article} (must be 'a' or 'the')"
            )));
        }
        features.insert("article".into(), MetaValue::from(article.as_str()));
    }
    if let Some(pos) = &args.pos {
        features.insert("pos".into(), MetaValue::from(pos.as_str()));
    }
    if let Some(tense) = &args.tense {
        features.insert("tense".into(), MetaValue::from(tense.as_str()));
    }
    if let Some(person) = &args.person {
        features.insert("person".into(), MetaValue::from(person.as_str()));
    }
    if let Some(degree) = &args.degree {
        features.insert("degree".into(), MetaValue::from(degree.as_str()));
    }

    let mut properties = MetaMap::new();
    if let Some(countable) = &args.countable {
        if countable != "yes" && countable != "no" {
            return Err(CliError::invalid(format!(
                "invalid countable value: {countable} (must be 'yes' or 'no')"
            )));
        }
        properties.insert("countable".into(), MetaValue::from(countable.as_str()));
    }
    if let Some(gender) = &args.gender {
        properties.insert("gender".into(), MetaValue::from(gender.as_str()));
    }

    let result = linguistics::surface_form(&args.lang, &args.base_form, &features, &properties);

    if ctx.json {
        ctx.emit_json(&result);
        return Ok(());
    }
    println!("{}", result.text);
    if args.explain {
        println!("  {}", result.explanation);
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}
