use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use mango::{Cpu, Machine, Stop};

/// Mango assembles and runs programs for a small 8-bit register machine.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.asm` or binary `.bin` file directly and output to terminal
    Run {
        /// `.asm` or `.bin` file to run
        name: PathBuf,
        /// Stop after this many instructions [env: MANGO_MAX_STEPS]
        #[arg(long)]
        max_steps: Option<usize>,
        /// Pause and dump registers before the instruction on this (1-based) line
        #[arg(short, long = "break", value_name = "LINE")]
        breakpoints: Vec<usize>,
        /// Print registers after the run [env: MANGO_REGISTERS=1]
        #[arg(short, long)]
        registers: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Create binary `.bin` image to run later
    Compile {
        /// `.asm` file to compile
        name: PathBuf,
        /// Destination to output .bin file
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
}

struct RunOptions {
    max_steps: usize,
    breakpoints: Vec<usize>,
    registers: bool,
    minimal: bool,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    mango::env::init();
    init_logging();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(mango::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run {
                name,
                max_steps,
                breakpoints,
                registers,
                minimal,
            } => run(
                &name,
                RunOptions {
                    max_steps: max_steps.unwrap_or_else(mango::env::max_steps),
                    breakpoints,
                    registers: registers || mango::env::print_registers(),
                    minimal,
                },
            ),
            Command::Compile { name, dest } => {
                file_message(Green, "Assembling", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let assembly = mango::assemble(&contents)?;

                let out_file_name = dest.unwrap_or_else(|| name.with_extension("bin"));
                fs::write(&out_file_name, &assembly.code).into_diagnostic()?;

                message(
                    Green,
                    "Finished",
                    &format!("emit binary ({} bytes)", assembly.code.len()),
                );
                file_message(Green, "Saved", &out_file_name);
                Ok(())
            }
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let _ = mango::assemble(&contents)?;
                message(Green, "Success", "no errors found!");
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(
            &path,
            RunOptions {
                max_steps: mango::env::max_steps(),
                breakpoints: Vec::new(),
                registers: mango::env::print_registers(),
                minimal: false,
            },
        )
    } else {
        println!("\n~ mango v{VERSION} ~");
        println!("{SHORT_INFO}");
        std::process::exit(0);
    }
}

/// Diagnostics from the library go to stderr, filtered by `MANGO_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_env("MANGO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, opts: RunOptions) -> Result<()> {
    use MsgColor::*;
    let say = |color: MsgColor, left: &str, right: &str| {
        if !opts.minimal {
            message(color, left, right);
        }
    };

    say(Green, "Assembling", &format!("target {}", name.display()));
    let mut machine = Machine::new();
    match name.extension().and_then(|ext| ext.to_str()) {
        Some("bin") => {
            if !opts.breakpoints.is_empty() {
                bail!("Breakpoints need a `.asm` source file");
            }
            let image = fs::read(name).into_diagnostic()?;
            machine.load(&image)?;
        }
        Some("asm") => {
            let contents = fs::read_to_string(name).into_diagnostic()?;
            machine.assemble(&contents)?;
        }
        Some(_) => bail!("File has unknown extension. Exiting..."),
        None => bail!("File has no extension. Exiting..."),
    }

    for line in &opts.breakpoints {
        if *line == 0 {
            bail!("Line numbers start at 1");
        }
        machine.set_breakpoint(line - 1)?;
    }
    for bp in machine.breakpoints().iter() {
        say(
            Cyan,
            "Breakpoint",
            &format!("set on line {} (address {:#04x})", bp.line + 1, bp.address),
        );
    }

    say(Green, "Running", "assembled image");
    loop {
        let budget = opts.max_steps.saturating_sub(machine.steps() as usize);
        match machine.run(budget)? {
            Stop::Halted => {
                say(Green, "Halted", &format!("after {} steps", machine.steps()));
                break;
            }
            Stop::Breakpoint { line, address } => {
                say(
                    Cyan,
                    "Breakpoint",
                    &format!("line {} (address {address:#04x})", line + 1),
                );
                print_registers(machine.cpu(), opts.minimal);
            }
            Stop::StepLimit => {
                say(
                    Red,
                    "Stopped",
                    &format!("step limit of {} reached", opts.max_steps),
                );
                break;
            }
        }
    }

    if opts.registers || opts.minimal {
        print_registers(machine.cpu(), opts.minimal);
    }
    say(Green, "Completed", &format!("target {}", name.display()));
    Ok(())
}

fn print_registers(cpu: &Cpu, minimal: bool) {
    let [a, b, c, d] = *cpu.gpr();
    let flags = cpu.flags();
    let bit = |set: bool| u8::from(set);
    let regs = format!(
        "A={a:#04x} B={b:#04x} C={c:#04x} D={d:#04x} PC={:#04x} SP={:#04x}",
        cpu.pc(),
        cpu.sp()
    );
    let flags = format!(
        "Z={} C={} O={} N={}",
        bit(flags.zero),
        bit(flags.carry),
        bit(flags.overflow),
        bit(flags.negative)
    );
    if minimal {
        println!("{regs} {flags}");
    } else {
        println!("{:>12} {regs}", "Registers".cyan());
        println!("{:>12} {flags}", "Flags".cyan());
    }
}

const SHORT_INFO: &str = r"
Welcome to mango, an assembler and simulator for a small 8-bit register machine
with four general registers, a downward growing stack and 256 bytes of memory.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
