use algocore::{NodeEvent, NodeEventKind, NodeHandle, PropertyMap, Value, PROPAGATION_RULES};
use algonodes::register_all;
use algoruntime::{improve, render_svg, write_dot, NodeRegistry, Scheduler};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

#[derive(Parser)]
#[command(name = "algograph")]
#[command(about = "Dependency-graph execution engine demo", long_about = None)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the percentile demo pipeline
    Run {
        /// Independent generator chains feeding the two means
        #[arg(long, default_value_t = 10)]
        repetitions: usize,

        /// Length of each random array
        #[arg(long, default_value_t = 100)]
        amount: i64,

        /// Moving-average window
        #[arg(long, default_value_t = 5)]
        window: i64,

        /// Position picked out of each averaged array
        #[arg(long, default_value_t = 30)]
        position: i64,

        /// Percentile order applied to each raw array
        #[arg(long, default_value_t = 70)]
        order: i64,

        /// Run the whole graph on the calling thread
        #[arg(long)]
        serial: bool,

        /// Fuse removable 1:1 chains before executing
        #[arg(long)]
        fuse: bool,
    },

    /// List available node types
    Nodes,

    /// Export the demo pipeline as a GraphViz description
    Graph {
        /// Output file path
        #[arg(short, long, default_value = "algograph.gv")]
        output: PathBuf,

        /// Also render an SVG through the external dot tool
        #[arg(long)]
        render: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::Run { repetitions, amount, window, position, order, serial, fuse } => {
            run_pipeline(repetitions, amount, window, position, order, serial, fuse).await?;
        }
        Commands::Nodes => {
            list_nodes();
        }
        Commands::Graph { output, render } => {
            export_graph(&output, render)?;
        }
    }

    Ok(())
}

/// The two sink nodes of the demo pipeline.
struct Pipeline {
    mean_position: NodeHandle,
    mean_percentile: NodeHandle,
}

fn rules_entry(source: &str, destination: &str) -> (String, Value) {
    (
        PROPAGATION_RULES.to_string(),
        Value::Object(HashMap::from([(source.to_string(), Value::from(destination))])),
    )
}

fn params(entries: Vec<(String, Value)>) -> PropertyMap {
    entries.into_iter().collect()
}

/// Build `repetitions` generator chains, each feeding a picked element into
/// one shared mean and a percentile into the other.
fn build_pipeline(
    registry: &NodeRegistry,
    repetitions: usize,
    amount: i64,
    window: i64,
    position: i64,
    order: i64,
) -> Result<Pipeline> {
    let mean_position = registry.create_labeled(
        "stats.mean",
        "mean-of-picks",
        params(vec![rules_entry("PickedElement", "Array")]),
    )?;
    let mean_percentile = registry.create_labeled(
        "stats.mean",
        "mean-of-percentiles",
        params(vec![rules_entry("Percentile", "Array")]),
    )?;

    for k in 0..repetitions {
        let generator = registry.create(
            "source.random",
            params(vec![
                ("Amount".to_string(), Value::from(amount)),
                ("Seed".to_string(), Value::from(k as i64)),
            ]),
        )?;
        let average = registry.create(
            "stats.moving_average",
            params(vec![
                ("Size".to_string(), Value::from(window)),
                rules_entry("Numbers", "Array"),
            ]),
        )?;
        let picker = registry.create(
            "array.pick",
            params(vec![("Position".to_string(), Value::from(position))]),
        )?;
        let percentile = registry.create(
            "stats.percentile",
            params(vec![
                ("Order".to_string(), Value::from(order)),
                rules_entry("Numbers", "Array"),
            ]),
        )?;

        let _ = generator.clone() >> average.clone() >> picker.clone() >> mean_position.clone();
        let _ = mean_percentile.clone() << percentile.clone() << generator.clone();
    }

    Ok(Pipeline { mean_position, mean_percentile })
}

/// Wait until the node finishes or an advisory abort reaches it.
async fn await_node(node: &NodeHandle, rx: &mut Receiver<NodeEvent>) -> Result<()> {
    if node.is_finished() {
        return Ok(());
    }
    loop {
        match rx.recv().await {
            Ok(event) => match event.kind {
                NodeEventKind::Finished => return Ok(()),
                NodeEventKind::Aborted { message, .. } => {
                    anyhow::bail!("pipeline aborted: {message}")
                }
                NodeEventKind::Started => {}
            },
            Err(RecvError::Lagged(_)) => {
                if node.is_finished() {
                    return Ok(());
                }
            }
            Err(RecvError::Closed) => anyhow::bail!("event channel closed unexpectedly"),
        }
    }
}

async fn run_pipeline(
    repetitions: usize,
    amount: i64,
    window: i64,
    position: i64,
    order: i64,
    serial: bool,
    fuse: bool,
) -> Result<()> {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);

    let pipeline = build_pipeline(&registry, repetitions, amount, window, position, order)?;
    println!("🚀 Pipeline: {} repetitions, {} numbers each", repetitions, amount);

    if fuse {
        improve(&pipeline.mean_position);
        println!("   Removable chains fused for inline execution");
    }

    let scheduler = Scheduler::new();
    let mut rx_position = pipeline.mean_position.subscribe();
    let mut rx_percentile = pipeline.mean_percentile.subscribe();

    if serial {
        let blocking = scheduler.clone();
        let mean_position = pipeline.mean_position.clone();
        let mean_percentile = pipeline.mean_percentile.clone();
        tokio::task::spawn_blocking(move || {
            blocking.execute_serial(&mean_position);
            blocking.execute_serial(&mean_percentile);
        })
        .await?;
    } else {
        scheduler.execute_parallel(&pipeline.mean_position);
        scheduler.execute_parallel(&pipeline.mean_percentile);
    }

    await_node(&pipeline.mean_position, &mut rx_position).await?;
    await_node(&pipeline.mean_percentile, &mut rx_percentile).await?;

    let picked = pipeline
        .mean_position
        .output("Mean")
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NAN);
    let percentile = pipeline
        .mean_percentile
        .output("Mean")
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NAN);

    println!();
    println!("📊 Results:");
    println!("   Mean of the {position}-th averaged elements: {picked:.6}");
    println!("   Mean of the {order}-percentiles:             {percentile:.6}");

    Ok(())
}

fn list_nodes() {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);

    println!("📦 Available node types:");
    let mut types = registry.list_types();
    types.sort();
    for type_name in types {
        println!();
        println!("  • {}", type_name);
        if let Some(slots) = registry.slots(&type_name) {
            for slot in slots {
                println!("      {:?} {} ({:?})", slot.kind, slot.name, slot.ty);
            }
        }
    }
}

fn export_graph(output: &PathBuf, render: bool) -> Result<()> {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);

    // A small instance of the demo pipeline is enough to look at.
    let pipeline = build_pipeline(&registry, 2, 100, 5, 30, 70)?;
    if render {
        render_svg(&pipeline.mean_position, output)?;
    } else {
        write_dot(&pipeline.mean_position, output)?;
    }
    println!("✨ Wrote {}", output.display());
    Ok(())
}
