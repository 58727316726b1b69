/// Playthrough — play the cases from a terminal, or let a seeded random
/// player run them.
///
/// Usage: playthrough [--cases <path>] [--templates <path>] [--energy <n>]
///                    [--auto] [--seed <n>]
///
/// Commands:
///   open <faction>   — switch chat channel (open truth to read the briefing)
///   buy <faction>    — buy a faction storyline
///   trial            — open the judgment panel
///   choose <n>       — select choice n at the current stage
///   state            — show phase, energy, stage and storyline buttons
///   snapshot         — print the ending snapshot as JSON
///   ending           — print the resolved ending
///   help             — list commands
///   quit             — exit
use lex_speculum::core::autoplay::Autoplayer;
use lex_speculum::core::session::{GamePhase, GameSession, SessionEvent};
use lex_speculum::schema::faction::Faction;
use std::io::{self, BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut cases_path = "case_data/cases.json".to_string();
    let mut templates_path = None;
    let mut energy: u32 = 3;
    let mut auto = false;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--cases" if i + 1 < args.len() => {
                i += 1;
                cases_path = args[i].clone();
            }
            "--templates" if i + 1 < args.len() => {
                i += 1;
                templates_path = Some(args[i].clone());
            }
            "--energy" if i + 1 < args.len() => {
                i += 1;
                energy = args[i].parse().unwrap_or(3);
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--auto" => auto = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = GameSession::builder().cases_path(&cases_path).energy(energy);
    if let Some(ref path) = templates_path {
        builder = builder.templates_path(path);
    }
    let mut session = match builder.build() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if auto {
        match Autoplayer::new(seed).play(&mut session) {
            Ok(snapshot) => {
                for record in &snapshot.case_records {
                    let bought: Vec<&str> =
                        record.purchased_factions.iter().map(|f| f.name()).collect();
                    println!(
                        "{}: path {:?}, storylines [{}]",
                        record.case_id,
                        record.judgment_path,
                        bought.join(", ")
                    );
                }
                print_ending(&session);
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = session.start() {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
    print_events(&mut session);
    println!("Type 'help' for commands. Start with 'open truth'.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("court> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Court adjourned.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "open" | "buy" => {
                let Some(faction) = parts.get(1).and_then(|name| Faction::parse(name)) else {
                    println!("Usage: {} <truth|order|love|peace>", cmd);
                    continue;
                };
                if cmd == "open" {
                    for message in session.open_channel(faction) {
                        println!("[{}] {}", faction, message);
                    }
                } else {
                    match session.purchase_storyline(faction) {
                        Ok(outcome) => println!("{:?}", outcome),
                        Err(e) => println!("ERROR: {}", e),
                    }
                }
            }
            "trial" => {
                if let Err(e) = session.enter_judgment_phase() {
                    println!("ERROR: {}", e);
                }
            }
            "choose" => {
                let Some(index) = parts.get(1).and_then(|n| n.parse::<usize>().ok()) else {
                    println!("Usage: choose <n>");
                    continue;
                };
                match session.select_choice(index) {
                    Ok(outcome) => {
                        for verdict in outcome.verdicts.unwrap_or_default() {
                            println!("{}: {:?}", verdict.faction, verdict.compliance);
                        }
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "state" => print_state(&session),
            "snapshot" => match session.snapshot().to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => println!("ERROR: {}", e),
            },
            "ending" => print_ending(&session),
            _ => println!("Unknown command: {}. Type 'help'.", cmd),
        }

        print_events(&mut session);
        if session.phase() == GamePhase::GameEnd {
            print_ending(&session);
            break;
        }
    }
}

fn print_events(session: &mut GameSession) {
    for event in session.drain_events() {
        match event {
            SessionEvent::CaseStarted { case_id, title } => {
                println!("\n=== {} ({}) ===", title, case_id)
            }
            SessionEvent::PhaseChanged(phase) => println!("-- {:?}", phase),
            SessionEvent::StageShown(_) => print_stage(session),
            SessionEvent::ChannelUnread(faction) => println!("  (new message on {})", faction),
            SessionEvent::CaseEnded { case_id, .. } => println!("Case {} closed.", case_id),
            SessionEvent::GameEnded => println!("\nAll cases judged."),
            SessionEvent::StageHidden(_) | SessionEvent::FactionButton { .. } => {}
        }
    }
}

fn print_stage(session: &GameSession) {
    let Some(stage) = session.current_stage() else {
        return;
    };
    println!("\n{}", stage.label);
    for choice in &stage.choices {
        println!("  [{}] {}", choice.index, choice.text);
    }
}

fn print_state(session: &GameSession) {
    println!("Phase: {:?}", session.phase());
    println!(
        "Energy: {}/{}",
        session.energy().current(),
        session.energy().max()
    );
    if let Some(case) = session.current_case() {
        println!("Case: {} ({})", case.definition.title, case.id());
        for storyline in &case.definition.storylines {
            let faction = storyline.faction;
            let status = if session.purchased().contains(&faction) {
                "owned"
            } else if session.faction_button_enabled(faction) {
                "available"
            } else {
                "locked"
            };
            println!("  {} storyline: {}", faction, status);
        }
    }
    print_stage(session);
    println!(
        "Opinion: {}  Scores: {:?}",
        session.aggregator().total_opinion(),
        session.aggregator().scores().iter().collect::<Vec<_>>()
    );
}

fn print_ending(session: &GameSession) {
    let ending = session.resolve_ending();
    println!("\n--- Ending ---");
    for line in &ending.narrative {
        println!("{}", line);
    }
    println!("\n--- Visual Prompt ---");
    println!("{}", ending.visual_prompt());
}

fn print_usage() {
    println!("Usage: playthrough [--cases <path>] [--templates <path>] [--energy <n>] [--auto] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  open <faction>   switch chat channel (open truth to read the briefing)");
    println!("  buy <faction>    buy a faction storyline");
    println!("  trial            open the judgment panel");
    println!("  choose <n>       select choice n at the current stage");
    println!("  state            show phase, energy, stage and storyline buttons");
    println!("  snapshot         print the ending snapshot as JSON");
    println!("  ending           print the resolved ending");
    println!("  quit             exit");
}
