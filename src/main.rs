use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use hartz::asm::{assemble, encoding, SymbolTable};
use hartz::ast::machine;

/// Exit code for bad command-line arguments (`EX_USAGE`),
/// kept apart from the assembler's error classes.
const USAGE_EXIT: u8 = 64;

const LONG_ABOUT: &str = "Hartz assembler.

Translates Hartz assembly into one binary instruction word per line.
The output file is only written when the whole program assembles.
Set RUST_LOG=debug to follow each pass.";

#[derive(Parser, Debug)]
#[command(
    name = "translator",
    version,
    about = "Hartz assembler",
    long_about = LONG_ABOUT
)]
struct Cli {
    /// Assembly source file.
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// File to write the instruction words to.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
    #[arg(
        short = 'w',
        long = "warnings",
        long_help = "Report labels, functions and constants which are never used."
    )]
    warnings: bool,
    #[arg(
        short = 's',
        long = "symbols",
        long_help = "Print the label and constant tables. They are printed even if assembly fails."
    )]
    symbols: bool,
    #[arg(
        short = 'i',
        long = "info",
        long_help = "Print the constraints of the target machine."
    )]
    info: bool,
    #[arg(
        short = 'f',
        long = "halt-only",
        long_help = "Skip assembling, and write a single HALT word to the output."
    )]
    halt_only: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version are printed through the same path
            let _ = e.print();
            return match e.use_stderr() {
                true  => ExitCode::from(USAGE_EXIT),
                false => ExitCode::SUCCESS,
            };
        }
    };

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    if cli.info {
        print_machine_info();
    }

    if cli.halt_only {
        let out = create_output(cli)?;
        encoding::write_words(out, &[encoding::halt_word()])
            .with_context(|| format!("could not write to {}", cli.output.display()))?;
        return Ok(ExitCode::SUCCESS);
    }

    let input = File::open(&cli.input)
        .with_context(|| format!("could not open {}", cli.input.display()))?;
    log::info!("assembling {}", cli.input.display());

    let asm = match assemble(BufReader::new(input)) {
        Ok(asm) => asm,
        Err(report) => {
            eprintln!("{report}");
            eprintln!("{}: {} error(s), no output written", cli.input.display(), report.errors().len());
            if cli.symbols {
                print_symbols(report.labels(), report.consts());
            }
            return Ok(ExitCode::from(report.exit_code()));
        }
    };

    if cli.warnings {
        for warning in asm.unused_symbol_warnings() {
            eprintln!("{warning}");
        }
    }
    if cli.symbols {
        let program = asm.program();
        print_symbols(program.labels(), program.consts());
    }

    let out = create_output(cli)?;
    asm.write_words(out)
        .with_context(|| format!("could not write to {}", cli.output.display()))?;
    log::info!("wrote {} word(s) to {}", asm.program().terms().instr_count(), cli.output.display());

    Ok(ExitCode::SUCCESS)
}

fn create_output(cli: &Cli) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(&cli.output)
        .with_context(|| format!("could not create {}", cli.output.display()))?;
    Ok(BufWriter::new(file))
}

fn print_symbols(labels: &SymbolTable, consts: &SymbolTable) {
    println!("labels:\n{labels}");
    println!("constants:\n{consts}");
}

fn print_machine_info() {
    println!("Hartz machine");
    println!("  registers:        {} source, {} destination", machine::MAX_REGS, machine::MAX_REGS);
    println!("  memory:           {} words", machine::MEMORY_SIZE);
    println!("  data cache:       {} words", machine::CACHE_SIZE);
    println!("  word size:        {} bits", machine::WORD_SIZE);
    println!("  largest literal:  {}", machine::MAX_LITERAL);
}
