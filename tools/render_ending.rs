/// Render Ending — resolve an ending snapshot into its narrative and visual
/// prompt, and optionally request the artwork.
///
/// Usage: render_ending <snapshot.json> [--templates <path>] [--request]
///                      [--out <image.png>]
///
/// `--request` reads LEX_SPECULUM_IMAGEN_KEY (and optionally
/// LEX_SPECULUM_IMAGEN_URL, LEX_SPECULUM_IMAGEN_TIMEOUT_SECS) from the
/// environment.
use lex_speculum::core::imagen::{EndingService, ImagenConfig};
use lex_speculum::core::resolver::NarrativeTemplateResolver;
use lex_speculum::core::templates::EndingTemplates;
use lex_speculum::schema::record::EndingSnapshot;
use std::path::Path;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!(
            "Usage: render_ending <snapshot.json> [--templates <path>] [--request] [--out <image.png>]"
        );
        process::exit(0);
    }

    let snapshot_path = &args[1];
    let mut templates_path = None;
    let mut request = false;
    let mut out_path = "ending.png".to_string();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--templates" if i + 1 < args.len() => {
                i += 1;
                templates_path = Some(args[i].clone());
            }
            "--out" if i + 1 < args.len() => {
                i += 1;
                out_path = args[i].clone();
            }
            "--request" => request = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let snapshot = match std::fs::read_to_string(snapshot_path)
        .map_err(|e| e.to_string())
        .and_then(|json| EndingSnapshot::from_json(&json).map_err(|e| e.to_string()))
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("ERROR: Failed to read snapshot: {}", e);
            process::exit(1);
        }
    };

    let templates = match templates_path {
        Some(ref path) => match EndingTemplates::load_from_ron(Path::new(path)) {
            Ok(templates) => templates,
            Err(e) => {
                eprintln!("ERROR: Failed to load templates: {}", e);
                process::exit(1);
            }
        },
        None => EndingTemplates::default(),
    };
    let resolver = NarrativeTemplateResolver::new(templates);

    let ending = resolver.resolve(&snapshot);
    println!(
        "Tone: {:?}  Dominance: {:?}  Conflict: {:?}",
        ending.tone, ending.dominance, ending.conflict
    );
    println!("\n--- Narrative ---");
    for line in &ending.narrative {
        println!("{}", line);
    }
    println!("\n--- Visual Prompt ---");
    println!("{}", ending.visual_prompt());

    if !request {
        return;
    }

    let service = match EndingService::from_config(ImagenConfig::from_env(), resolver) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };
    match service.request_ending(&snapshot) {
        Ok(artwork) => {
            if let Err(e) = std::fs::write(&out_path, &artwork.image) {
                eprintln!("ERROR: Failed to write {}: {}", out_path, e);
                process::exit(1);
            }
            println!("\nWrote {} bytes to {}", artwork.image.len(), out_path);
        }
        Err(e) => {
            eprintln!("ERROR: Image request failed: {}", e);
            process::exit(1);
        }
    }
}
