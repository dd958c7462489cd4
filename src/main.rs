use std::path::PathBuf;

use asmtrace::{
    Address, Code, Contract, EncodingError, OutputError, RevmEngine, TraceConfig, Tracer,
    contract::address_from_bytes, hex, programs,
};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tracing::Level;

const OUTPUT_DIR: &str = "output";

#[derive(Parser)]
#[command(version, about = "Assemble EVM programs and dump their execution trace as JSON")]
struct Cli {
    #[command(subcommand)]
    program: Program,

    /// Gas available to the contract code
    #[arg(long, default_value_t = 100, global = true)]
    gas_limit: u64,

    /// Address the contract is installed at
    #[arg(long, value_parser = parse_address, global = true)]
    address: Option<Address>,

    /// Sender of the call, the zero address when omitted
    #[arg(long, value_parser = parse_address, global = true)]
    caller: Option<Address>,

    /// Where to write the trace, defaults to a file named after the program in `output/`
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Program {
    /// ADD 0xdeadbeef 0xcafeb0ba, then SUB 0xfaceb00c 0xb0bacafe
    AddSub,
    /// MSTORE 0x80 at 0x40, then MLOAD 0x40
    MstoreMload,
    /// Run hex encoded bytecode as is
    Bytecode { code: String },
}

impl Program {
    fn name(&self) -> &'static str {
        match self {
            Program::AddSub => "add_sub",
            Program::MstoreMload => "mstore_mload",
            Program::Bytecode { .. } => "bytecode",
        }
    }

    fn code(&self) -> Result<Code, Error> {
        let code: Code = match self {
            Program::AddSub => programs::add_sub()?.into(),
            Program::MstoreMload => programs::mstore_mload()?.into(),
            Program::Bytecode { code } => {
                let digits = code.strip_prefix("0x").unwrap_or(code);
                hex::decode(digits)
                    .map_err(|_| Error::InvalidBytecode(code.clone()))?
                    .into()
            }
        };

        Ok(code)
    }

    fn default_output(&self) -> PathBuf {
        PathBuf::from(OUTPUT_DIR).join(self.name()).with_extension("json")
    }
}

fn main() -> Result<(), Error> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let address = args.address.unwrap_or_else(default_address);
    let contracts = [Contract::new(address, args.program.code()?)];
    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.program.default_output());

    let config = TraceConfig::default().with_gas_limit(args.gas_limit);
    let mut tracer = Tracer::new(RevmEngine, config);

    if let Some(trace) = tracer.trace_to_file(address, args.caller, &contracts, &out_path)? {
        println!(
            "{:>12} {} ({} steps, {} gas)",
            "Traced".bright_green(),
            args.program.name(),
            trace.steps.len(),
            trace.gas_used
        );
    }

    println!("{:>12} {}", "Wrote".bright_green(), out_path.display());

    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("couldn't assemble program")]
    Encoding(#[from] EncodingError),
    #[error("bytecode is not valid hex: {0}")]
    InvalidBytecode(String),
    #[error("couldn't write trace")]
    Output(#[from] OutputError),
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn default_address() -> Address {
    Address::with_last_byte(0xff)
}

fn parse_address(s: &str) -> Result<Address, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| format!("invalid hex address: {e}"))?;

    address_from_bytes(&bytes).ok_or_else(|| format!("{s} is longer than 20 bytes"))
}
