/// Courtroom example — a scripted run through the bundled cases.
///
/// Reads each briefing, buys a few storylines until the energy runs out,
/// walks a fixed verdict through every judgment tree and prints the ending.
///
/// Run with: cargo run --example courtroom

use lex_speculum::core::session::{GameSession, SessionEvent};
use lex_speculum::schema::faction::Faction;

/// Storylines to buy and verdict path to take, per case.
const SCRIPT: [(&[Faction], &[usize]); 3] = [
    (&[Faction::Order, Faction::Love], &[0, 0]),
    (&[Faction::Peace], &[1, 1]),
    (&[Faction::Peace], &[1, 0]),
];

fn main() {
    let mut session = GameSession::builder()
        .cases_path("case_data/cases.json")
        .templates_path("case_data/ending_templates.ron")
        .build()
        .expect("Failed to build session");

    session.start().expect("Failed to start");

    for (purchases, path) in SCRIPT {
        let case = session.current_case().expect("No case loaded");
        println!("\n=== {} ===", case.definition.title);

        // Reading the Truth channel is what unlocks the storyline shop.
        for line in session.open_channel(Faction::Truth) {
            println!("[Truth] {}", line);
        }

        for &faction in purchases {
            let outcome = session
                .purchase_storyline(faction)
                .expect("Storyline not offered");
            println!("Buy {}: {:?} (energy {})", faction, outcome, session.energy().current());
            for line in session.open_channel(faction) {
                println!("  [{}] {}", faction, line);
            }
        }

        session.enter_judgment_phase().expect("Trial did not open");
        for &index in path {
            let stage = session.current_stage().expect("No stage shown");
            println!("{} -> {}", stage.label, stage.choices[index].text);
            let outcome = session.select_choice(index).expect("Choice rejected");
            for verdict in outcome.verdicts.unwrap_or_default() {
                println!("  {}: {:?}", verdict.faction, verdict.compliance);
            }
        }

        for event in session.drain_events() {
            if let SessionEvent::ChannelUnread(faction) = event {
                println!("  (unread on {})", faction);
            }
        }
    }

    let snapshot = session.snapshot();
    println!(
        "\nOpinion {} | Order {} | Love {} | Peace {}",
        snapshot.total_opinion,
        snapshot.score(Faction::Order),
        snapshot.score(Faction::Love),
        snapshot.score(Faction::Peace)
    );

    let ending = session.resolve_ending();
    println!("\n--- Ending ---");
    for line in &ending.narrative {
        println!("{}", line);
    }
    println!("\n--- Visual Prompt ---");
    println!("{}", ending.visual_prompt());
}
