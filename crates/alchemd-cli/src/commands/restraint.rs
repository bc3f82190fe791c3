use crate::cli::RestraintArgs;
use crate::error::{CliError, Result};
use alchemd::engine::restraint::RestraintFile;
use alchemd::workflows::{
    self,
    restraint::{RestraintReport, RestraintRequest},
    squash::SystemFiles,
};
use std::io::Write;
use tracing::info;

fn write_text(report: &RestraintReport, args: &RestraintArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            writeln!(file, "{}", report.text)?;
            println!("Restraint for {} written to: {}", report.engine, path.display());
        }
        None => println!("{}", report.text),
    }
    Ok(())
}

fn build_report(args: &RestraintArgs) -> Result<RestraintReport> {
    let input = SystemFiles::from(&args.input);
    let system = input.load()?;

    info!("Loading restraint description from {:?}", &args.restraint);
    let file = RestraintFile::from_path(&args.restraint)
        .map_err(|e| CliError::file_parsing(&args.restraint, e))?;

    let mut request = RestraintRequest::new(args.engine.into(), args.method.into());
    if let Some(frame) = &args.reference_frame {
        info!("Rebinding restraint to reference frame {:?}", frame);
        let frame = SystemFiles::new(&input.topology)
            .with_coordinates(frame)
            .load()?;
        request = request.with_reference_frame(frame);
    }

    Ok(workflows::restraint::run(&system, &file, &request)?)
}

pub fn run(args: RestraintArgs) -> Result<()> {
    let report = build_report(&args)?;
    write_text(&report, &args)?;

    let g = &report.geometry;
    println!(
        "Anchor geometry: r = {:.3} A, thetaA = {:.3} rad, thetaB = {:.3} rad, phiA = {:.3} rad, phiB = {:.3} rad, phiC = {:.3} rad",
        g.r, g.theta_a, g.theta_b, g.phi_a, g.phi_b, g.phi_c
    );
    println!(
        "Restraint energy: {:.4} kcal/mol",
        report.energy_kcal_per_mol()
    );
    println!(
        "Standard-state correction ({}): {:.4} kcal/mol",
        report.method,
        report.correction_kcal_per_mol()
    );
    Ok(())
}
