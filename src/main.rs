use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use notify::{Event, RecursiveMode, Watcher};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gridplay::error::{ScriptError, SyntaxError};
use gridplay::game::render::DrawList;
use gridplay::game::{Game, RuntimeConfig, TickOutcome};
use gridplay::parser::parse_script;
use gridplay::project::ProjectSnapshot;

#[derive(Parser)]
#[command(name = "gridplay", version)]
#[command(about = "Export tile games to standalone HTML")]
struct Cli {
    /// Log more (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a project snapshot to a self-contained HTML file
    Export {
        /// Project snapshot (.json)
        file: PathBuf,

        /// Write output to file instead of stdout
        #[arg(short)]
        o: Option<PathBuf>,

        /// Strict mode: treat script warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Validate a snapshot and lint its scripts without producing output
    Check {
        /// Project snapshot (.json)
        file: PathBuf,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Run a game headless for a number of frames and report its state
    Play {
        /// Project snapshot (.json)
        file: PathBuf,

        /// Frames to run
        #[arg(long, default_value_t = 60)]
        frames: u32,

        /// Milliseconds between frames
        #[arg(long, default_value_t = 16.0)]
        step: f64,

        /// Hold KEY during FRAME (1-based), e.g. `3:ArrowRight`
        #[arg(long = "press", value_parser = parse_press)]
        presses: Vec<(u32, String)>,

        /// Seed for Math.random
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Save the last frame as a PNG
        #[cfg(feature = "snapshot")]
        #[arg(long)]
        png: Option<PathBuf>,
    },

    /// Re-export whenever the snapshot file changes
    Watch {
        /// Project snapshot (.json)
        file: PathBuf,

        /// Output HTML file
        #[arg(short, default_value = "game.html")]
        o: PathBuf,
    },
}

fn parse_press(raw: &str) -> std::result::Result<(u32, String), String> {
    let (frame, key) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected FRAME:KEY, got '{raw}'"))?;
    let frame = frame
        .parse()
        .map_err(|_| format!("'{frame}' is not a frame number"))?;
    if key.is_empty() {
        return Err("key must not be empty".to_string());
    }
    Ok((frame, key.to_string()))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Export { file, o, strict } => export(&file, o.as_deref(), strict),
        Commands::Check { file, strict } => check(&file, strict),
        Commands::Play {
            file,
            frames,
            step,
            presses,
            seed,
            #[cfg(feature = "snapshot")]
            png,
        } => {
            let run = Run {
                frames,
                step,
                presses,
                seed,
            };
            let game = play(&file, &run);
            #[cfg(feature = "snapshot")]
            let game = game.and_then(|game| {
                if let Some(path) = &png {
                    save_png(&game, path)?;
                }
                Ok(game)
            });
            game.map(|game| report(&game))
        }
        Commands::Watch { file, o } => watch(&file, &o),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn read_snapshot(file: &Path) -> Result<ProjectSnapshot> {
    let json = fs::read_to_string(file).with_context(|| format!("cannot read '{}'", file.display()))?;
    gridplay::load_snapshot(&json).with_context(|| format!("invalid snapshot '{}'", file.display()))
}

/// Lint every script, showing syntax errors with a caret under the
/// offending token. Returns the number of findings.
fn lint(snapshot: &ProjectSnapshot) -> usize {
    let warnings = gridplay::codegen::lint_scripts(snapshot);
    for w in &warnings {
        eprintln!("warning: {w}");
        let failed = snapshot
            .object_names
            .iter()
            .zip(&snapshot.codes)
            .filter(|(name, _)| w.starts_with(&format!("script for '{name}': ")));
        for (_, code) in failed {
            if let Err(e) = parse_script(code) {
                print_snippet(&e, code);
            }
        }
    }
    warnings.len()
}

fn export(file: &Path, out: Option<&Path>, strict: bool) -> Result<()> {
    let snapshot = read_snapshot(file)?;
    if lint(&snapshot) > 0 && strict {
        bail!("warnings treated as errors (--strict)");
    }
    let html = gridplay::export_html(&snapshot)?;

    match out {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("cannot write '{}'", path.display()))?;
            eprintln!("wrote HTML to {} ({} bytes)", path.display(), html.len());
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn check(file: &Path, strict: bool) -> Result<()> {
    let snapshot = read_snapshot(file)?;
    let findings = lint(&snapshot);
    if findings > 0 && strict {
        bail!("{findings} warning(s) treated as errors (--strict)");
    }
    eprintln!(
        "ok: {} ({} objects, {} scripts)",
        file.display(),
        snapshot.game_objects.len(),
        snapshot.codes.iter().filter(|c| !c.trim().is_empty()).count()
    );
    Ok(())
}

struct Run {
    frames: u32,
    step: f64,
    presses: Vec<(u32, String)>,
    seed: u64,
}

fn play(file: &Path, run: &Run) -> Result<Game> {
    let snapshot = read_snapshot(file)?;
    let config = RuntimeConfig {
        seed: run.seed,
        ..RuntimeConfig::default()
    };
    let mut game = gridplay::new_game(&snapshot, config)?;
    let mut canvas = DrawList::new();

    for frame in 1..=run.frames {
        let held: Vec<&str> = run
            .presses
            .iter()
            .filter(|(f, _)| *f == frame)
            .map(|(_, key)| key.as_str())
            .collect();
        for key in &held {
            game.press_key(key);
        }

        canvas.clear();
        let outcome = game.tick(f64::from(frame) * run.step, &mut canvas);
        for sound in game.drain_sounds() {
            info!(frame, sound = %sound, "sound played");
        }
        if let TickOutcome::Faulted(fault) = outcome {
            eprintln!("error: frame {frame}: {fault}");
            if let ScriptError::Syntax(e) = &fault.error {
                if let Some(code) = script_of(&snapshot, &game, &fault.entity) {
                    print_snippet(e, code);
                }
            }
            bail!("game halted");
        }

        for key in &held {
            game.release_key(key);
        }
    }
    Ok(game)
}

/// Script source of the sprite an entity was created from.
fn script_of<'a>(snapshot: &'a ProjectSnapshot, game: &Game, id: &str) -> Option<&'a str> {
    let sprite = game.object(id)?.sprite;
    snapshot.codes.get(sprite).map(String::as_str)
}

fn report(game: &Game) {
    println!("time {} ms", game.time());
    for object in game.objects() {
        println!(
            "{:<16} x={:<6} y={:<6} layer={}",
            object.id, object.x, object.y, object.layer
        );
    }
    for text in game.texts() {
        println!("text {:<11} {:?} at ({}, {})", text.id, text.text, text.x, text.y);
    }
    if let Some(dialogue) = game.dialogue() {
        println!("say  {dialogue:?}");
    }
}

#[cfg(feature = "snapshot")]
fn save_png(game: &Game, path: &Path) -> Result<()> {
    let mut raster = gridplay::game::render::Raster::for_grid(game.grid());
    game.render(&mut raster);
    raster
        .save_png(path)
        .with_context(|| format!("cannot write '{}'", path.display()))?;
    eprintln!("wrote frame to {}", path.display());
    Ok(())
}

fn watch(file: &Path, out: &Path) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if event.kind.is_modify() || event.kind.is_create() {
                let _ = tx.send(());
            }
        }
    })?;
    let dir = file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    eprintln!("gridplay watch");
    eprintln!("  file:   {}", file.display());
    eprintln!("  output: {}", out.display());
    eprintln!("  watching for changes...");

    rebuild(file, out);
    while rx.recv().is_ok() {
        // editors write in bursts; coalesce them
        while rx.recv_timeout(Duration::from_millis(100)).is_ok() {}
        rebuild(file, out);
    }
    Ok(())
}

fn rebuild(file: &Path, out: &Path) {
    match export(file, Some(out), false) {
        Ok(()) => info!(file = %file.display(), "re-exported"),
        Err(e) => warn!("export failed: {e:#}"),
    }
}

fn print_snippet(e: &SyntaxError, source: &str) {
    if let Some(span) = &e.span {
        if span.start <= source.len() {
            let line_num = source[..span.start].chars().filter(|c| *c == '\n').count() + 1;
            let line_start = source[..span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line_end = source[span.start..]
                .find('\n')
                .map(|i| span.start + i)
                .unwrap_or(source.len());
            let line = &source[line_start..line_end];
            let col = source[line_start..span.start].chars().count();

            eprintln!();
            eprintln!("  {line_num} | {line}");
            eprintln!(
                "  {} | {}^",
                " ".repeat(line_num.to_string().len()),
                " ".repeat(col)
            );
        }
    }
}
