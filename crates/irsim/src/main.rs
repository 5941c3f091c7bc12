use clap::Parser;
use irsim::{Config, Pipeline, die};

/// synthesize infrared spectra and rank methods against a reference
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// input file
    #[arg(value_parser, default_value_t = String::from("irsim.toml"))]
    infile: String,

    /// Overwrite existing output from a previous run. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    overwrite: bool,

    /// Skip the SVG plot of each molecule.
    #[arg(long, default_value_t = false)]
    no_plot: bool,

    /// Serialize the input file to JSON and exit.
    #[arg(short, long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut config = Config::load(&args.infile)
        .unwrap_or_else(|e| die!("{e:#}"));
    if args.no_plot {
        config.plot = false;
    }
    if args.json {
        match serde_json::to_string(&config) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                die!("failed to serialize {} with {e}", args.infile);
            }
        };
        return Ok(());
    }
    println!("{config}");

    let pipeline = Pipeline::new(config).unwrap_or_else(|e| die!("{e:#}"));
    let report = pipeline.run(args.overwrite)?;
    println!("{report}");

    if !report.failed().is_empty() {
        die!("{} molecules failed", report.failed().len());
    }
    println!("normal termination of irsim");

    Ok(())
}
