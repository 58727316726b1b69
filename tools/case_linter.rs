/// Case Linter — validates authored cases before they ship.
///
/// Usage: case_linter <cases.json> [--templates <ending_templates.ron>]
use lex_speculum::core::session::Case;
use lex_speculum::core::templates::EndingTemplates;
use lex_speculum::core::tree::TreeLint;
use lex_speculum::schema::case::{load_cases_from_json, CaseDefinition};
use lex_speculum::schema::faction::Faction;
use std::collections::HashSet;
use std::path::Path;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: case_linter <cases.json> [--templates <ending_templates.ron>]");
        process::exit(0);
    }

    let cases_path = &args[1];
    let mut templates_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--templates" && i + 1 < args.len() {
            i += 1;
            templates_path = Some(args[i].clone());
        }
        i += 1;
    }

    let cases = match load_cases_from_json(Path::new(cases_path)) {
        Ok(cases) => cases,
        Err(e) => {
            eprintln!("ERROR: Failed to load cases: {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} cases", cases.len());

    let (mut errors, warnings) = lint_cases(&cases);

    if let Some(ref path) = templates_path {
        match EndingTemplates::load_from_ron(Path::new(path)) {
            Ok(_) => println!("Loaded ending templates from {}", path),
            Err(e) => errors.push(format!("ending templates '{}': {}", path, e)),
        }
    }

    println!("\n=== Case Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_cases(cases: &[CaseDefinition]) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if cases.is_empty() {
        errors.push("case list is empty; the game cannot start".to_string());
    }

    let mut seen_ids = HashSet::new();
    for definition in cases {
        let id = &definition.case_id;
        if !seen_ids.insert(id.clone()) {
            errors.push(format!("case '{}' is defined more than once", id));
        }
        if definition.title.is_empty() {
            warnings.push(format!("case '{}' has no title", id));
        }
        if definition.briefing.is_empty() {
            warnings.push(format!("case '{}' has no briefing messages", id));
        }

        let case = match Case::compile(definition.clone()) {
            Ok(case) => case,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };

        for lint in case.tree.lints() {
            match lint {
                TreeLint::EmptyLabelChild {
                    stage,
                    choice_index,
                    hidden_choices,
                } => warnings.push(format!(
                    "case '{}': choice {} of stage '{}' leads to an unlabelled stage; {} choice(s) under it are never offered",
                    id, choice_index, stage, hidden_choices
                )),
            }
        }

        for storyline in &definition.storylines {
            let prefix = &storyline.requirement.required_prefix;
            if storyline.faction == Faction::Truth {
                warnings.push(format!("case '{}': Truth storyline offered for purchase", id));
            }
            if prefix.is_empty() {
                warnings.push(format!(
                    "case '{}': {} storyline has an empty requirement and always complies",
                    id, storyline.faction
                ));
            } else if !case.tree.admits_prefix(prefix) {
                errors.push(format!(
                    "case '{}': {} requirement {:?} can never be satisfied",
                    id, storyline.faction, prefix
                ));
            }
            if storyline.chat_messages.is_empty() {
                warnings.push(format!(
                    "case '{}': {} storyline has no chat messages",
                    id, storyline.faction
                ));
            }
            if storyline
                .chat_messages
                .iter()
                .chain(&storyline.success_messages)
                .chain(&storyline.failure_messages)
                .any(|m| m.sender != storyline.faction)
            {
                warnings.push(format!(
                    "case '{}': {} storyline carries messages from another faction",
                    id, storyline.faction
                ));
            }
        }
    }

    (errors, warnings)
}
