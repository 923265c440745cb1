use clap::{Parser, Subcommand, ValueEnum};
use grammar_derive::{Grammar, GrammarBuilder, GrammarConfig, Target};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Derive words from context-free and matrix grammars
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file (text format, or JSON with a .json extension)
    #[arg(help = "Path to the grammar file")]
    grammar_file: Option<PathBuf>,

    /// Length of the word to derive, 0 for any length
    #[arg(short, long, default_value_t = 0)]
    length: usize,

    /// Number of derivations to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Seed for reproducible derivations
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of rewrite steps
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum length of intermediate words
    #[arg(long)]
    max_length: Option<usize>,

    /// Reject matrices that use undeclared symbols
    #[arg(long)]
    strict_matrices: bool,

    /// Print derivations as JSON
    #[arg(long)]
    json: bool,

    /// Do not print the grammar before deriving
    #[arg(short, long)]
    quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example grammar files
    Example {
        /// Type of grammar to generate
        #[arg(value_enum, default_value_t = ExampleKind::Cfg)]
        grammar_type: ExampleKind,

        /// Output file path
        #[arg(help = "Output file path")]
        output: Option<PathBuf>,

        /// Write the JSON form instead of the text format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExampleKind {
    Cfg,
    Mg,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Commands::Example {
                grammar_type,
                output,
                json,
            } => {
                let name = match grammar_type {
                    ExampleKind::Cfg => "cfg",
                    ExampleKind::Mg => "mg",
                };
                let output_path = output.unwrap_or_else(|| {
                    let extension = if json { "json" } else { "txt" };
                    PathBuf::from(format!("example_{}_grammar.{}", name, extension))
                });

                write_example_grammar(grammar_type, &output_path, json)?;

                println!(
                    "Created example {} grammar at: {}",
                    name,
                    output_path.display()
                );
                return Ok(());
            }
        }
    }

    let grammar_file = cli.grammar_file.ok_or("Grammar file path required")?;

    let defaults = GrammarConfig::default();
    let config = GrammarConfig {
        max_depth: cli.max_depth.unwrap_or(defaults.max_depth),
        max_length: cli.max_length.unwrap_or(defaults.max_length),
        strict_matrices: cli.strict_matrices,
    };
    let grammar = Grammar::from_file_with_config(&grammar_file, config)?;

    if !cli.quiet {
        println!("{}\n", grammar);
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let target = Target::from(cli.length);

    for i in 0..cli.count {
        match grammar.derive(target, &mut rng) {
            Some(derivation) if cli.json => println!("{}", serde_json::to_string(&derivation)?),
            Some(derivation) => {
                if cli.count > 1 {
                    println!("{}. {}", i + 1, derivation);
                } else {
                    println!("Derivation:\n{}", derivation);
                }
            }
            None => {
                println!("No word of {} is derivable within bounds.", target);
                break;
            }
        }
    }

    Ok(())
}

fn example_grammar(kind: ExampleKind) -> grammar_derive::Result<Grammar> {
    match kind {
        // Balanced words over a and b
        ExampleKind::Cfg => GrammarBuilder::context_free('S')
            .nonterminals("SA")
            .terminals("ab")
            .rule('S', "aSb")
            .rule('S', "SS")
            .rule('S', "ab")
            .rule('S', "aA")
            .rule('A', "b")
            .build(),
        // a^n b^n c^n
        ExampleKind::Mg => GrammarBuilder::matrix_grammar('S')
            .nonterminals("SABC")
            .terminals("abc")
            .matrix(&[('S', "ABC")])
            .matrix(&[('A', "aA"), ('B', "bB"), ('C', "cC")])
            .matrix(&[('A', "a"), ('B', "b"), ('C', "c")])
            .build(),
    }
}

fn write_example_grammar(
    kind: ExampleKind,
    path: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let grammar = example_grammar(kind)?;

    let content = if json {
        serde_json::to_string_pretty(&grammar.to_definition())?
    } else {
        grammar.to_text()
    };

    fs::write(path, content)?;
    Ok(())
}
