use crate::cli::{SplicerKind, SquashArgs};
use crate::error::{CliError, Result};
use alchemd::engine::config::SplicerConfig;
use alchemd::workflows::{
    self,
    squash::{OutputFiles, SystemFiles},
};
use tracing::info;

fn splicer_config(args: &SquashArgs) -> Result<SplicerConfig> {
    match args.splicer {
        SplicerKind::Native => {
            if args.splicer_program.is_some() || !args.splicer_args.is_empty() {
                return Err(CliError::Argument(
                    "--splicer-program and --splicer-arg require --splicer external".to_string(),
                ));
            }
            Ok(SplicerConfig::Native)
        }
        SplicerKind::External => {
            let program = args.splicer_program.clone().ok_or_else(|| {
                CliError::Argument("--splicer external requires --splicer-program".to_string())
            })?;
            Ok(SplicerConfig::External {
                program,
                args: args.splicer_args.clone(),
            })
        }
    }
}

pub fn run(args: SquashArgs) -> Result<()> {
    let splicer = splicer_config(&args)?;
    std::fs::create_dir_all(&args.output_dir)?;

    let input = SystemFiles::from(&args.input);
    let output = OutputFiles::in_dir(&args.output_dir, &args.stem);
    let mapping_path = args
        .mapping
        .clone()
        .unwrap_or_else(|| args.output_dir.join(format!("{}.mapping.json", args.stem)));

    info!("Squashing system from {:?}", &input.topology);
    let summary = workflows::squash::run(&input, &output, &mapping_path, &splicer)?;

    println!(
        "Squashed {} molecule(s) ({} perturbable) into {} molecule(s) with {} atom(s).",
        summary.merged_molecules,
        summary.perturbable_molecules,
        summary.squashed_molecules,
        summary.squashed_atoms
    );
    println!("  Topology:    {}", output.topology.display());
    println!("  Coordinates: {}", output.coordinates.display());
    println!("  Mapping:     {}", mapping_path.display());
    Ok(())
}
