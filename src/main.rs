//! Atree Planner - Entry Point
//!
//! Loads an ability catalog, applies a selection plus control and item
//! values, and prints the resulting validation, spells and stats.

use atree_planner::atree::AbilityCatalog;
use atree_planner::core::error::{PlannerError, Result};
use atree_planner::core::types::{AbilityId, PlayerClass};
use atree_planner::core::PlannerConfig;
use atree_planner::planner::{BuildPlanner, PlannerSnapshot};

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Ability tree build planner
#[derive(Parser, Debug)]
#[command(name = "atree-planner")]
#[command(about = "Validate an ability tree selection and derive its spells and stats")]
struct Args {
    /// Ability catalog JSON, keyed by class name
    #[arg(long)]
    tree: PathBuf,

    /// Character class
    #[arg(long, default_value = "Warrior")]
    class: String,

    /// Character level; anything non-numeric means max level
    #[arg(long, default_value = "")]
    level: String,

    /// Ability ids to select, comma separated
    #[arg(long, value_delimiter = ',')]
    select: Vec<u32>,

    /// Slider value as name=value (repeatable)
    #[arg(long, value_parser = parse_assignment)]
    slider: Vec<(String, f64)>,

    /// Toggle label to switch on (repeatable)
    #[arg(long)]
    toggle: Vec<String>,

    /// Item stat as name=value (repeatable)
    #[arg(long, value_parser = parse_assignment)]
    stat: Vec<(String, f64)>,

    /// Planner configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad value in '{}': {}", raw, e))?;
    Ok((name.trim().to_string(), value))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("atree_planner=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    let catalog = AbilityCatalog::load(&args.tree)?;
    let class: PlayerClass = args
        .class
        .parse()
        .map_err(|_| PlannerError::UnknownClass(args.class.clone()))?;
    tracing::info!(%class, path = %args.tree.display(), "loaded ability catalog");

    let max_listed_errors = config.max_listed_errors;
    let mut planner = BuildPlanner::new(catalog, config)?;
    planner.set_class(class)?;
    planner.set_level(args.level.as_str())?;
    for id in &args.select {
        planner.set_active(AbilityId(*id), true)?;
    }
    for (name, value) in &args.slider {
        planner.set_slider(name.as_str(), *value)?;
    }
    for label in &args.toggle {
        planner.set_toggle(label.as_str(), true)?;
    }
    planner.set_item_stats(args.stat.iter().cloned().collect())?;

    let snapshot = planner.refresh()?;
    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        Format::Text => print_text(&snapshot, max_listed_errors),
    }
    Ok(())
}

fn print_text(snapshot: &PlannerSnapshot, max_listed_errors: usize) {
    let report = &snapshot.validation;
    println!("=== {} ===", snapshot.class);
    println!("Ability points: {}/{}", report.points_spent, report.ap_cap);
    for line in report.error_lines(max_listed_errors) {
        println!("  ! {}", line);
    }
    if report.hard_error {
        println!("Build is invalid; spells are not shown.");
    }

    println!();
    println!("Active abilities:");
    for ability in snapshot.merged.iter() {
        println!("  [{}] {}", ability.id, ability.display_name);
    }

    if let Some(error) = &snapshot.controls_error {
        println!();
        println!("Slider discovery failed: {}", error);
    }
    if let Some(error) = &snapshot.composition_error {
        println!();
        println!("Spell composition failed: {}", error);
    }
    if !snapshot.sheets.is_empty() {
        println!();
        println!("Spells:");
        for sheet in &snapshot.sheets {
            let spell = &sheet.spell;
            match spell.cost {
                Some(cost) => println!("  {} ({}): {} mana", spell.name, spell.base_spell, cost),
                None => println!("  {} ({})", spell.name, spell.base_spell),
            }
            for part in &spell.parts {
                println!("    {}: {:?} power {}", part.name, part.multipliers, part.power);
            }
        }
    }

    if !snapshot.controls.sliders.is_empty() || !snapshot.controls.toggles.is_empty() {
        println!();
        println!("Controls:");
        for slider in snapshot.controls.sliders.values() {
            println!("  slider {} (max {})", slider.name, slider.max);
        }
        for toggle in snapshot.controls.toggles.values() {
            println!("  toggle {}", toggle.label);
        }
    }

    if let Some(error) = &snapshot.stats_error {
        println!();
        println!("Stat aggregation failed: {}", error);
    }
    if !snapshot.stats.is_empty() {
        println!();
        println!("Stat changes:");
        for (name, value) in snapshot.stats.iter() {
            println!("  {}: {:+}", name, value);
        }
    }

    if !report.reachable_hints.is_empty() {
        println!();
        let hints: Vec<String> = report.reachable_hints.iter().map(ToString::to_string).collect();
        println!("Can still take: {}", hints.join(", "));
    }
}
