use clap::{Parser, Subcommand};
use pcb_tokenize::dataset::build_dataset;
use pcb_tokenize::error::TokenizeError;
use pcb_tokenize::{xml, ConvertOptions, Grammar, Vocabulary};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pcb-tokenize", about = "Convert Eagle boards to token strings and back")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a board (.brd, .brd.gz) to a token string
    Encode {
        board: PathBuf,

        /// Token grammar (compact, tree)
        #[arg(short, long, default_value = "compact")]
        grammar: String,

        /// Fold placed packages into plain and signal geometry first
        #[arg(long)]
        flatten: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decode a token string file to an Eagle board
    Decode {
        tokens: PathBuf,

        /// Token grammar (compact, tree)
        #[arg(short, long, default_value = "compact")]
        grammar: String,

        /// Board whose plain and signals are replaced by the decoded ones
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Output board file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the symbol to id table of a grammar as JSON
    Vocab {
        /// Token grammar (compact, tree)
        #[arg(short, long, default_value = "compact")]
        grammar: String,

        /// Id of the first symbol
        #[arg(long, default_value_t = 1)]
        base: u32,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output JSON file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encode boards, directories and zip archives to one line per board
    Dataset {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Token grammar (compact, tree)
        #[arg(short, long, default_value = "compact")]
        grammar: String,

        /// Fold placed packages into plain and signal geometry first
        #[arg(long)]
        flatten: bool,

        /// Output text file
        #[arg(short, long)]
        output: PathBuf,

        /// Write a JSON summary of encoded boards and failures
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

fn parse_grammar(s: &str) -> Grammar {
    match s.parse() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn emit(output: Option<&Path>, content: &[u8]) -> Result<(), TokenizeError> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            eprintln!("Written to {}", path.display());
        }
        None => std::io::stdout().write_all(content)?,
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, TokenizeError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn run(command: Command) -> Result<(), TokenizeError> {
    match command {
        Command::Encode {
            board,
            grammar,
            flatten,
            output,
        } => {
            let opts = ConvertOptions {
                grammar: parse_grammar(&grammar),
                flatten,
            };
            let mut tokens = pcb_tokenize::board_file_to_tokens(&board, &opts)?;
            tokens.push('\n');
            emit(output.as_deref(), tokens.as_bytes())
        }
        Command::Decode {
            tokens,
            grammar,
            template,
            output,
        } => {
            let grammar = parse_grammar(&grammar);
            let text = std::fs::read_to_string(&tokens)?;
            let board = match template {
                Some(path) => {
                    let template = xml::read_board_file(&path)?;
                    pcb_tokenize::tokens_to_board_with_template(&text, grammar, &template)?
                }
                None => pcb_tokenize::tokens_to_board(&text, grammar)?,
            };
            emit(output.as_deref(), &xml::serialize(&board)?)
        }
        Command::Vocab {
            grammar,
            base,
            pretty,
            output,
        } => {
            let grammar = parse_grammar(&grammar);
            let vocab = Vocabulary::build(grammar.tokenizer().as_ref(), base);
            let mut json = to_json(&vocab, pretty)?;
            json.push('\n');
            emit(output.as_deref(), json.as_bytes())
        }
        Command::Dataset {
            inputs,
            grammar,
            flatten,
            output,
            summary,
        } => {
            let opts = ConvertOptions {
                grammar: parse_grammar(&grammar),
                flatten,
            };
            let mut out = BufWriter::new(std::fs::File::create(&output)?);
            let result = build_dataset(&inputs, &opts, &mut out)?;
            out.flush()?;
            eprintln!(
                "Written {} boards to {} ({} failed)",
                result.encoded,
                output.display(),
                result.failures.len()
            );
            if let Some(path) = summary {
                std::fs::write(&path, to_json(&result, true)?)?;
            }
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
