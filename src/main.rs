use clap::{Parser as ClapParser, Subcommand};
use reshape_lang::cli::{self, CliError, EvalOptions, EvalResult};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "reshape")]
#[command(about = "Reshape - evaluate transform expressions against JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and evaluate an expression
    Eval {
        /// The expression to evaluate
        expression: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Bind a variable, e.g. --var limit=10 (value is JSON or a plain string)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        variables: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Show the tokens of an expression
    Tokens {
        expression: String,

        /// Show bracket groups nested under their opener
        #[arg(long)]
        nested: bool,
    },

    /// Show the compiled tree of an expression
    Tree { expression: String },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval {
            expression,
            input,
            variables,
            pretty,
            syntax_only,
        } => run_eval(expression, input, variables, pretty, syntax_only),
        Commands::Tokens { expression, nested } => {
            cli::token_listing(&expression, nested).map(|listing| print!("{}", listing))
        }
        Commands::Tree { expression } => {
            cli::tree_listing(&expression).map(|listing| print!("{}", listing))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_eval(
    expression: String,
    input: Option<String>,
    variables: Vec<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    };

    let options = EvalOptions {
        expression,
        input,
        variables,
        pretty,
        syntax_only,
    };

    match cli::execute_eval(&options)? {
        EvalResult::SyntaxValid => println!("Syntax is valid"),
        EvalResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
