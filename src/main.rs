// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use entity_compare::{
    resolve_selection, ComparisonPipeline, ComparisonRun, FetchConfig, KnowledgeBase,
    Selection, SnapshotWriter, WikidataClient, DEFAULT_OUT_DIR,
};
use std::env;
use tracing_subscriber::EnvFilter;

struct CompareArgs {
    input_a: String,
    input_b: String,
    out_dir: String,
    save: bool,
    plain: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("search") if args.len() > 2 => run_search(&args[2..].join(" ")).await?,
        Some("compare") => run_compare(parse_compare_args(&args[2..])?).await?,
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("entity-compare {}", entity_compare::VERSION);
    println!();
    println!("Usage:");
    println!("  entity-compare search <term>");
    println!("  entity-compare compare <A> <B> [--out DIR] [--no-save] [--plain]");
    println!();
    println!("<A>/<B> are item ids (Q42) or search terms (\"Douglas Adams\").");
}

fn parse_compare_args(args: &[String]) -> Result<CompareArgs> {
    let mut positional = Vec::new();
    let mut out_dir = DEFAULT_OUT_DIR.to_string();
    let mut save = true;
    let mut plain = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => {
                out_dir = iter
                    .next()
                    .context("--out requires a directory")?
                    .clone();
            }
            "--no-save" => save = false,
            "--plain" => plain = true,
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() != 2 {
        bail!("compare needs exactly two entities, got {}", positional.len());
    }
    let input_b = positional.pop().unwrap_or_default();
    let input_a = positional.pop().unwrap_or_default();

    Ok(CompareArgs {
        input_a,
        input_b,
        out_dir,
        save,
        plain,
    })
}

fn build_client() -> Result<WikidataClient> {
    let config = FetchConfig::from_env().context("Invalid configuration")?;
    Ok(WikidataClient::new(config)?)
}

async fn run_search(term: &str) -> Result<()> {
    let client = build_client()?;

    println!("🔎 Searching Wikidata for \"{}\"...", term);
    let suggestions = client.search(term).await?;

    if suggestions.is_empty() {
        println!("❌ No matches");
        return Ok(());
    }

    for suggestion in &suggestions {
        println!("  • {}", suggestion.display());
    }

    Ok(())
}

async fn resolve(client: &WikidataClient, input: &str) -> Result<String> {
    match resolve_selection(client, input).await? {
        Selection::Direct(id) => Ok(id),
        Selection::Suggested(suggestion) => {
            println!("✓ \"{}\" → {}", input, suggestion.display());
            Ok(suggestion.id)
        }
        Selection::NoSelection => bail!("No entity found for \"{}\"", input),
    }
}

async fn run_compare(args: CompareArgs) -> Result<()> {
    println!("🔗 Wikidata Entity Comparison");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let client = build_client()?;
    let config = client.config().clone();

    println!("\n🔎 Resolving selections...");
    let id_a = resolve(&client, &args.input_a).await?;
    let id_b = resolve(&client, &args.input_b).await?;

    println!("\n📡 Fetching {} and {}...", id_a, id_b);
    let pipeline = ComparisonPipeline::new(client, config);
    let run = pipeline
        .run(&id_a, &id_b)
        .await
        .with_context(|| format!("Comparison of {} and {} failed", id_a, id_b))?;

    for warning in &run.warnings {
        println!("⚠️  {}", warning);
    }

    print_report(&run);

    if args.save {
        println!("\n💾 Writing snapshot...");
        let writer = SnapshotWriter::new(&args.out_dir);
        let run_name = SnapshotWriter::default_run_name(&run, Utc::now());
        let manifest = writer.write(&run, &run_name)?;
        println!(
            "✓ Wrote {} files to {}",
            manifest.files.len(),
            writer.out_dir().join(&manifest.run_name).display()
        );
    }

    if !args.plain {
        run_ui_mode(run)?;
    }

    Ok(())
}

fn print_report(run: &ComparisonRun) {
    let result = &run.result;
    let stats = &run.stats;

    println!("\n📊 {} vs {}", result.entity_a.display_name(), result.entity_b.display_name());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  {} statements: {}", result.entity_a.label, stats.total_a);
    println!("  {} statements: {}", result.entity_b.label, stats.total_b);
    println!("  Common:    {}", stats.common_count);
    println!("  Only {}: {}", result.entity_a.label, stats.only_a_count);
    println!("  Only {}: {}", result.entity_b.label, stats.only_b_count);
    println!("  Similarity: {:.1}%", stats.similarity_ratio * 100.0);

    if result.is_identical() {
        println!("\n🎉 Identical statement sets");
    }

    if !result.common.is_empty() {
        println!("\n✅ Common statements");
        for row in &result.common {
            println!("  {:<30} {}", row.property_label, row.value_label);
        }
    }

    let divergent = result.divergent_properties();
    if !divergent.is_empty() {
        println!("\n🔀 Divergent properties");
        for property in &divergent {
            let values = |rows: &[entity_compare::Statement]| {
                rows.iter()
                    .map(|r| r.value_label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("  {} ({})", property.property_label, property.property_id);
            println!("    {}: {}", result.entity_a.label, values(&property.values_a));
            println!("    {}: {}", result.entity_b.label, values(&property.values_b));
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(run: ComparisonRun) -> Result<()> {
    println!("\nStarting viewer... (Press 'q' to quit)\n");

    let mut app = ui::App::new(run);
    ui::run_ui(&mut app)?;

    println!("\n✅ Viewer closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_run: ComparisonRun) -> Result<()> {
    eprintln!("ℹ️  Terminal viewer not available (built without the tui feature)");
    eprintln!("   Pass --plain to skip it, or use the API: cargo run --bin compare-server --features server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_compare_args() {
        let parsed = parse_compare_args(&args(&["Q1", "Douglas Adams", "--out", "/tmp/x", "--plain"])).unwrap();
        assert_eq!(parsed.input_a, "Q1");
        assert_eq!(parsed.input_b, "Douglas Adams");
        assert_eq!(parsed.out_dir, "/tmp/x");
        assert!(parsed.save);
        assert!(parsed.plain);
    }

    #[test]
    fn test_parse_compare_args_defaults() {
        let parsed = parse_compare_args(&args(&["Q1", "Q2", "--no-save"])).unwrap();
        assert_eq!(parsed.out_dir, DEFAULT_OUT_DIR);
        assert!(!parsed.save);
        assert!(!parsed.plain);
    }

    #[test]
    fn test_parse_compare_args_rejects_bad_input() {
        assert!(parse_compare_args(&args(&["Q1"])).is_err());
        assert!(parse_compare_args(&args(&["Q1", "Q2", "--verbose"])).is_err());
        assert!(parse_compare_args(&args(&["Q1", "Q2", "--out"])).is_err());
    }
}
