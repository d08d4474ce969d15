//! optscan - table-driven command-line option decoding.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use optscan::harness::DEMO_CASES;
use optscan::output::generate_error_output;
use optscan::{
    demo_table, evaluate, generate_exports, generate_help, generate_json,
    generate_report_string, Evaluation, OptionTable, Verdict,
};

/// Decode command-line options against a JSON option table.
#[derive(Parser, Debug)]
#[command(name = "optscan", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan and validate arguments, then print the decoded values
    Parse {
        /// JSON option table
        #[arg(long)]
        table: String,

        /// Program name reported as argument 0
        #[arg(long, default_value = "prog")]
        name: String,

        /// How to print the decoded values
        #[arg(long, value_enum, default_value_t = Format::Report)]
        format: Format,

        /// Variable prefix for the shell format
        #[arg(long, default_value = "OPT_")]
        prefix: String,

        /// Arguments to decode
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print usage text for an option table
    Help {
        /// JSON option table
        #[arg(long)]
        table: String,

        /// Program name shown in the usage line
        #[arg(long, default_value = "prog")]
        name: String,
    },

    /// Run the built-in demonstration scenarios
    Demo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `name => 'value'` lines
    Report,
    /// JSON object
    Json,
    /// Path of a sourceable file of export statements
    Shell,
}

/// Exit status for errors of optscan itself (bad table JSON, I/O), kept
/// apart from the verdict codes a scan can produce.
const CLI_ERROR_CODE: i32 = 64;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    std::process::exit(exit_code(run(cli.command)));
}

fn exit_code(outcome: Result<i32>) -> i32 {
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("optscan: {:#}", err);
            CLI_ERROR_CODE
        }
    }
}

fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Parse {
            table,
            name,
            format,
            prefix,
            args,
        } => {
            let table = load_table(&table)?;
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(name.clone());
            argv.extend(args);

            let eval = evaluate(&argv, &table);
            print_evaluation(&eval, &table, &name, format, &prefix)?;
            Ok(eval.verdict.code())
        }
        Commands::Help { table, name } => {
            let table = load_table(&table)?;
            print!("{}", generate_help(&table, &name)?);
            Ok(0)
        }
        Commands::Demo => Ok(run_demo()),
    }
}

fn load_table(json: &str) -> Result<OptionTable> {
    let table = OptionTable::from_json(json).context("failed to parse option table JSON")?;
    table.validate().context("invalid option table")?;
    Ok(table)
}

/// Human-readable reason for a non-success verdict.
fn failure_message(eval: &Evaluation) -> Option<String> {
    eval.state
        .failure()
        .map(ToString::to_string)
        .or_else(|| eval.validation.as_ref().map(ToString::to_string))
}

fn print_evaluation(
    eval: &Evaluation,
    table: &OptionTable,
    name: &str,
    format: Format,
    prefix: &str,
) -> Result<()> {
    if eval.verdict == Verdict::Success {
        match format {
            Format::Report => print!("{}", generate_report_string(&eval.state, table)),
            Format::Json => println!(
                "{}",
                generate_json(&eval.state).context("failed to serialize values")?
            ),
            Format::Shell => {
                let path = generate_exports(&eval.state, prefix)
                    .context("failed to generate output file")?;
                println!("{}", path.display());
            }
        }
        return Ok(());
    }

    let message = failure_message(eval).unwrap_or_else(|| "help requested".to_string());

    if format == Format::Shell {
        let path = generate_error_output(&message, eval.verdict.code())
            .context("failed to generate output file")?;
        println!("{}", path.display());
        return Ok(());
    }

    if eval.verdict == Verdict::Help {
        if let Some(reason) = failure_message(eval) {
            eprintln!("{}: {}", name, reason);
        }
        print!("{}", generate_help(table, name)?);
    } else {
        eprintln!("{}: {}", name, message);
    }
    Ok(())
}

fn run_demo() -> i32 {
    let table = demo_table();
    let mut failed = 0;

    for case in DEMO_CASES {
        println!("Performing test {}", case.id);
        let actual = case.run(&table);
        if actual == case.expected {
            println!("Test {} passed", case.id);
        } else {
            println!(
                "Test {} failed. Expected {}, actual {}",
                case.id,
                case.expected.name(),
                actual.name()
            );
            failed += 1;
        }
    }

    if failed == 0 {
        0
    } else {
        1
    }
}
