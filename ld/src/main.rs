use clap::Parser;
use color_print::cprintln;
use mld::linker;
use mld::loader::Loader;
use mld::{exec, map};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "Linker for MSP430-style relocatable object files", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input object files
    input: Vec<String>,

    /// Output executable (TI-TXT)
    #[clap(short, long, default_value = "linked.txt")]
    output: String,

    /// Write a link map report
    #[clap(long)]
    map: Option<String>,

    /// Print a hex dump of the linked segments
    #[clap(long)]
    dump: bool,

    /// Simulate a load into the 64 KiB memory image
    #[clap(long)]
    load: bool,
}

fn main() {
    let args = Args::parse();
    println!("MSP430 Linker");

    if let Err(e) = run(&args) {
        cprintln!("<red,bold>error</>: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), mld::Error> {
    for input in &args.input {
        println!("  < {}", input);
    }
    let merged = obj::codec::read_multiple(&args.input)?;
    let linked = linker::link(merged)?;

    exec::write(Path::new(&args.output), &linked.segments)?;
    println!("  > {}", args.output);

    if let Some(map_path) = &args.map {
        map::write(Path::new(map_path), &args.output, &linked)?;
        println!("  > {}", map_path);
    }

    if args.dump {
        for segment in linked.segments.values() {
            println!("{} @ 0x{:04X} ({} bytes)", segment.name, segment.origin, segment.len());
            print!("{}", segment.hex_dump());
        }
    }

    if args.load {
        let loader = Loader::new(&linked.segments);
        let programmed = loader.image().iter().filter(|b| **b != 0xFF).count();
        println!("Loaded image: {} byte(s) programmed", programmed);
    }

    Ok(())
}
