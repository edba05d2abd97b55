/// Converts PCSX2 savestates into core files for debuggers.
use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};
use log::Level;

use ps2dump::prelude::v1::*;

fn main() -> Result<()> {
    let matches = parse_args();
    init_logger(&matches);

    match matches.subcommand() {
        Some(("run", sub)) => dump(sub),
        Some(("threads", sub)) => threads(sub),
        _ => {
            Err(Error(ErrorOrigin::Args, ErrorKind::ArgValidation).log_error("no subcommand given"))
        }
    }
}

fn parse_args() -> ArgMatches {
    Command::new("ps2dump")
        .version(crate_version!())
        .about("converts PCSX2 savestates into MIPS ELF core files")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("writes the core file of a savestate")
                .arg(Arg::new("savestate").action(ArgAction::Set).required(true))
                .arg(Arg::new("output").action(ArgAction::Set).required(true))
                .arg(
                    Arg::new("no-threads")
                        .long("no-threads")
                        .action(ArgAction::SetTrue)
                        .help("only write the executing context"),
                )
                .arg(
                    Arg::new("entry")
                        .long("entry")
                        .short('e')
                        .action(ArgAction::Set)
                        .help("entry point recorded in the core file (decimal or 0x prefixed)"),
                ),
        )
        .subcommand(
            Command::new("threads")
                .about("prints the threads recovered from a savestate")
                .arg(Arg::new("savestate").action(ArgAction::Set).required(true)),
        )
        .get_matches()
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    }
}

fn init_logger(matches: &ArgMatches) {
    // a logger that is already installed is not an error
    simplelog::TermLogger::init(
        log_level(matches.get_count("verbose")).to_level_filter(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stdout,
        simplelog::ColorChoice::Auto,
    )
    .ok();
}

fn parse_u32(value: &str) -> Result<u32> {
    let lower = value.to_ascii_lowercase();
    let parsed = match lower.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => lower.parse::<u32>(),
    };
    parsed.map_err(|err| {
        Error(ErrorOrigin::Args, ErrorKind::ArgValidation)
            .log_error(format!("invalid value {:?}: {}", value, err))
    })
}

fn savestate_arg(matches: &ArgMatches) -> Result<&str> {
    matches
        .get_one::<String>("savestate")
        .map(String::as_str)
        .ok_or(Error(ErrorOrigin::Args, ErrorKind::ArgValidation))
}

fn dump(matches: &ArgMatches) -> Result<()> {
    let input = savestate_arg(matches)?;
    let output = matches
        .get_one::<String>("output")
        .ok_or(Error(ErrorOrigin::Args, ErrorKind::ArgValidation))?;

    let mut config = DumpConfig::new().recover_threads(!matches.get_flag("no-threads"));
    if let Some(entry) = matches.get_one::<String>("entry") {
        config = config.entry(parse_u32(entry)?);
    }

    let summary = run_with_config(input, output, &config)?;
    println!(
        "{}: version {:#010x}, {} contexts, {:#x} bytes",
        output, summary.version, summary.contexts, summary.core_size
    );

    Ok(())
}

fn threads(matches: &ArgMatches) -> Result<()> {
    let input = savestate_arg(matches)?;
    let archive = ZipSavestate::open(input)?;
    let state = read_savestate(archive, &DumpConfig::new())?;

    println!(
        "version {:#010x}, pc {:#010x}, running thread {}",
        state.version,
        state.registers.pc,
        state
            .running_thread
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );

    println!(
        "{:>4} {:<18} {:>10} {:>10} {:>10} {:>10} {:>4} {:<9} {:>10} {:>10}",
        "ID", "STATUS", "PC", "SP", "GP", "ENTRY", "PRIO", "WAIT", "STACK", "SIZE"
    );
    for t in state.threads.iter() {
        println!(
            "{:>4} {:<18} {:#010x} {:#010x} {:#010x} {:#010x} {:>4} {:<9} {:#010x} {:#010x}",
            t.id,
            t.status_name(),
            t.pc,
            t.sp,
            t.gp,
            t.entry_init,
            t.priority,
            t.wait_type_name(),
            t.stack_init,
            t.stack_size
        );
    }

    Ok(())
}
