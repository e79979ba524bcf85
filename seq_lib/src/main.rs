use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

use mr_data::{mat, wav};
use seq_lib::mega_press::{MegaPress, MegaPressParams};
use spin_sim::error::{Error, Result};
use spin_sim::spin::SpinSystem;

// variable name the analysis tooling expects in the output .mat file
const FID_VAR_NAME: &str = "test_fid";

#[derive(clap::Parser, Debug)]
struct MegaSimArgs {
    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand, Debug)]
pub enum Action {
    /// write default params and spin-system files to a directory
    NewConfig(NewConfigArgs),
    /// run the sequence and write the FID
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewConfigArgs {
    destination: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// output .mat file
    output: PathBuf,
    /// static field offset in Hz applied to every spin
    freq_offset: f64,
    /// editing-pulse waveform (headerless little-endian f32)
    waveform: PathBuf,
    #[clap(long)]
    params: Option<PathBuf>,
    #[clap(long)]
    system: Option<PathBuf>,
}

fn main() {
    let args = MegaSimArgs::parse();
    let result = match &args.action {
        Action::NewConfig(args) => new_config(args),
        Action::Run(args) => run(args),
    };
    if let Err(e) = result {
        eprintln!("{}", e);
        exit(1);
    }
}

fn new_config(args: &NewConfigArgs) -> Result<()> {
    std::fs::create_dir_all(&args.destination)?;
    let params_file = args.destination.join("mega_press").with_extension("json");
    let sys_file = args.destination.join("spin_system").with_extension("json");
    MegaPressParams::write_default(&params_file)?;
    SpinSystem::write_default(&sys_file)?;
    println!("wrote {:?} and {:?}", params_file, sys_file);
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let params = match &args.params {
        Some(params_file) => MegaPressParams::load(params_file)?,
        None => MegaPressParams::default(),
    };
    let sys = match &args.system {
        Some(sys_file) => SpinSystem::load(sys_file)?,
        None => SpinSystem::default(),
    };

    println!("{}", sys);
    let sys = sys.shifted(args.freq_offset)?;
    println!("offset by {} Hz:\n{}", args.freq_offset, sys);

    let waveform = wav::read(&args.waveform)
        .map_err(|e| Error::Config(format!("cannot read waveform {:?}: {}", args.waveform, e)))?;
    println!("pulse length is {}", waveform.len());
    for sample in waveform.iter().take(10) {
        println!("{}", sample);
    }

    let seq = MegaPress::new(params)?;
    let timing = seq.timing(waveform.len())?;
    println!("T_12 {}", timing.t_12);
    println!("T_2g1 {}", timing.t_2g1);
    println!("T_pulse {}", timing.t_pulse);
    println!("T_g13 {}", timing.t_g13);
    println!("T_3g2 {}", timing.t_3g2);
    println!("T_g2r {}", timing.t_g2r);

    let data = seq.run(&sys, &waveform)?;
    mat::write_complex_vec(&args.output, FID_VAR_NAME, &data)?;

    for sample in data.iter().take(10) {
        println!("({},{})", sample.re, sample.im);
    }
    Ok(())
}
