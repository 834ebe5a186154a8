use std::path::PathBuf;

use clap::Parser;
use phenomenode::context::ContextFormat;
use phenomenode::demos::{self, DemoName};
use phenomenode::dot;
use phenomenode::export::{self, DiagramExport};
use phenomenode::preferences::Preferences;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Demo {
    Mixer,
    Chain,
    Nested,
}

impl From<Demo> for DemoName {
    fn from(d: Demo) -> Self {
        match d {
            Demo::Mixer => DemoName::Mixer,
            Demo::Chain => DemoName::Chain,
            Demo::Nested => DemoName::Nested,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Emit {
    Tree,
    Equations,
    Dot,
    Json,
    Fingerprint,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Format {
    Label,
    Short,
    Named,
    Formal,
}

impl From<Format> for ContextFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Label => ContextFormat::Label,
            Format::Short => ContextFormat::Short,
            Format::Named => ContextFormat::Named,
            Format::Formal => ContextFormat::Formal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "phn",
    version,
    about = "phenomenode — build a demo phenomena tree and print it"
)]
struct Cli {
    /// Demo model to build
    #[arg(value_enum, default_value_t = Demo::Chain)]
    demo: Demo,

    /// What to print
    #[arg(long, value_enum, default_value_t = Emit::Tree)]
    emit: Emit,

    /// Context format for variables
    #[arg(long, value_enum, default_value_t = Format::Named)]
    format: Format,

    /// Fill DOT clusters instead of outlining them
    #[arg(long)]
    fill_cluster: bool,

    /// Dark DOT palette
    #[arg(long)]
    dark: bool,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log construction steps to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut prefs = Preferences {
        context_format: cli.format.into(),
        ..Preferences::default()
    };
    if cli.dark {
        prefs.dark_mode();
    }
    if cli.fill_cluster {
        prefs.fill_cluster = true;
    }

    // ── Build ──
    let name: DemoName = cli.demo.into();
    let demo = match demos::build(name) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("phn: error[{}]: {}", e.code(), e);
            std::process::exit(1);
        }
    };
    tracing::info!(demo = %name, root = %demo.root, "built");

    // ── Emit ──
    let mode = prefs.context_format;
    let rendered = match cli.emit {
        Emit::Tree => demo.model.tree(demo.root, mode).map(|t| t + "\n"),
        Emit::Equations => demo
            .model
            .equations(demo.root)
            .map(|eqs| eqs.iter().map(|e| e.format(mode) + "\n").collect::<String>()),
        Emit::Dot => dot::emit_dot(&demo.model, demo.root, &prefs),
        Emit::Json | Emit::Fingerprint => DiagramExport::from_tree(&demo.model, demo.root, mode).map(|export| {
            let encoded = match cli.emit {
                Emit::Json => export.to_json(),
                _ => export::fingerprint(&export),
            };
            match encoded {
                Ok(text) => text + "\n",
                Err(e) => {
                    eprintln!("phn: error: {}", e);
                    std::process::exit(1);
                }
            }
        }),
    };
    let text = match rendered {
        Ok(t) => t,
        Err(e) => {
            eprintln!("phn: error[{}]: {}", e.code(), e);
            std::process::exit(1);
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &text) {
                eprintln!("phn: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            if cli.verbose {
                eprintln!("phn: wrote {}", path.display());
            }
        }
        None => print!("{}", text),
    }
}
