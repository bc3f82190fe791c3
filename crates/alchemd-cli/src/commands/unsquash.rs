use crate::cli::UnsquashArgs;
use crate::error::Result;
use alchemd::workflows::{
    self,
    squash::{OutputFiles, SystemFiles},
};
use tracing::info;

pub fn run(args: UnsquashArgs) -> Result<()> {
    std::fs::create_dir_all(&args.output_dir)?;

    let merged = SystemFiles::from(&args.merged);
    let squashed = match &args.squashed_coordinates {
        Some(coordinates) => SystemFiles::new(&args.squashed_topology).with_coordinates(coordinates),
        None => SystemFiles::new(&args.squashed_topology),
    };
    let output = OutputFiles::in_dir(&args.output_dir, &args.stem);

    info!("Mapping engine output {:?} back onto {:?}", &squashed.topology, &merged.topology);
    let updated = workflows::squash::run_unsquash(&merged, &squashed, &args.mapping, &output)?;

    println!(
        "Updated {} atom(s) of the merged system.",
        updated.num_atoms()
    );
    println!("  Topology:    {}", output.topology.display());
    println!("  Coordinates: {}", output.coordinates.display());
    Ok(())
}
