use clap::Parser;
use color_print::cprintln;
use masm::pass1::PassOne;
use masm::pass2::PassTwo;
use std::path::{Path, PathBuf};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "Assembler for the MSP430-style 16-bit ISA", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input source files
    input: Vec<String>,

    /// Output directory for object files
    #[clap(short, long, default_value = "obj")]
    output: String,

    /// Print the pass two listing
    #[clap(short, long)]
    listing: bool,
}

fn main() {
    let args = Args::parse();
    println!("MSP430 Assembler");

    let out_dir = PathBuf::from(&args.output);
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        cprintln!("<red,bold>error</>: cannot create output directory {}: {}", args.output, e);
        std::process::exit(1);
    }

    let mut compiled = 0usize;
    let mut failed = 0usize;

    for input in &args.input {
        println!("  < {}", input);
        match assemble_one(Path::new(input), &out_dir, args.listing) {
            Ok(object) => {
                println!("  > {}", object.display());
                compiled += 1;
            }
            Err(e) => {
                cprintln!("<red,bold>error</>: {} ({})", e, input);
                failed += 1;
            }
        }
    }

    println!("Compiled {} file(s)", compiled);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn assemble_one(input: &Path, out_dir: &Path, listing: bool) -> Result<PathBuf, masm::Error> {
    let pass1 = PassOne::assemble_file(input)?;
    let pass2 = PassTwo::assemble(pass1);

    if listing {
        println!("{}", pass2.listing);
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let object_path = out_dir.join(format!("{}.obj", stem));
    obj::codec::write(&object_path, &pass2.into_module())?;
    Ok(object_path)
}
