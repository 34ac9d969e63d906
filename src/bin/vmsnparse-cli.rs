use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use vmsnparse::VmwareMemorySpace;

/// Opens a VMware .vmss/.vmsn snapshot and prints its memory run table and
/// the first vCPU's CR3. Exercises the library end-to-end; not part of the
/// parsing core itself.
#[derive(ClapParser)]
#[command(name = "vmsnparse-cli", about = "Inspect a VMware snapshot's memory runs")]
struct Args {
    /// Path to a .vmss or .vmsn file.
    snapshot: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let file = match File::open(&args.snapshot) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: {}", args.snapshot.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let space = match VmwareMemorySpace::new(file) {
        Ok(space) => space,
        Err(e) => {
            eprintln!("{}: {}", args.snapshot.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("dtb: {:#010x}", space.dtb);
    println!("runs: {}", space.runs.len());
    for run in &space.runs {
        println!(
            "  gpa={:#012x} file_off={:#012x} len={:#x}",
            run.guest_physical_offset, run.file_offset, run.length
        );
    }

    ExitCode::SUCCESS
}
