use super::WorkflowError;
use crate::core::models::system::MolecularSystem;
use crate::core::units::{KCAL_PER_MOL, Quantity};
use crate::engine::restraint::{
    BoreschGeometry, CorrectionMethod, Engine, Restraint, RestraintFile, RestraintType,
};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct RestraintRequest {
    pub engine: Engine,
    pub method: CorrectionMethod,
    /// Frame to rebind the restraint to after it has been built.
    pub reference_frame: Option<MolecularSystem>,
}

impl RestraintRequest {
    pub fn new(engine: Engine, method: CorrectionMethod) -> Self {
        Self {
            engine,
            method,
            reference_frame: None,
        }
    }

    pub fn with_reference_frame(mut self, frame: MolecularSystem) -> Self {
        self.reference_frame = Some(frame);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestraintReport {
    pub restraint_type: RestraintType,
    pub engine: Engine,
    pub method: CorrectionMethod,
    /// Engine-ready restraint text.
    pub text: String,
    /// Standard-state correction.
    pub correction: Quantity,
    /// Anchor geometry of the bound system.
    pub geometry: BoreschGeometry,
    /// Restraint energy of the bound system.
    pub energy: Quantity,
}

impl RestraintReport {
    pub fn correction_kcal_per_mol(&self) -> f64 {
        self.correction.si_value() / KCAL_PER_MOL.scale()
    }

    pub fn energy_kcal_per_mol(&self) -> f64 {
        self.energy.si_value() / KCAL_PER_MOL.scale()
    }
}

/// Builds the restraint described by `file` on `system` and scores it.
#[instrument(skip_all, name = "restraint_workflow")]
pub fn run(
    system: &MolecularSystem,
    file: &RestraintFile,
    request: &RestraintRequest,
) -> Result<RestraintReport, WorkflowError> {
    let mut restraint: Restraint = file.build(system)?;
    if let Some(frame) = &request.reference_frame {
        restraint.update_system(frame)?;
    }

    let text = restraint.to_engine_string(request.engine)?;
    let correction = restraint.correction(request.method)?;
    let geometry = restraint.measure()?;
    let energy = restraint.energy()?;

    let report = RestraintReport {
        restraint_type: restraint.restraint_type(),
        engine: request.engine,
        method: request.method,
        text,
        correction,
        geometry,
        energy,
    };
    info!(
        engine = %report.engine,
        method = %report.method,
        correction = report.correction_kcal_per_mol(),
        "Restraint report ready."
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::gro::GroFile;
    use crate::core::io::json::JsonTopologyFile;
    use crate::core::io::traits::MolecularFile;
    use crate::engine::restraint::RestraintError;
    use crate::engine::restraint::fixtures::scenario_system;
    use crate::workflows::squash::SystemFiles;
    use approx::assert_relative_eq;

    const SCENARIO: &str = r#"
temperature = "300 K"

[anchors]
r1 = 0
r2 = 1
r3 = 2
l1 = 1495
l2 = 1496
l3 = 1497

[equilibrium]
r0 = "0.508 nm"
theta-a0 = "64.051 degree"
theta-b0 = "39.618 degree"
phi-a0 = "2.59 rad"
phi-b0 = "-1.20 rad"
phi-c0 = "2.63 rad"

[force-constants]
kr = "4184 kJ/mol/nm^2"
k-theta-a = "10 kcal/mol/rad^2"
k-theta-b = "10 kcal/mol/rad^2"
k-phi-a = "10 kcal/mol/rad^2"
k-phi-b = "10 kcal/mol/rad^2"
k-phi-c = "10 kcal/mol/rad^2"
"#;

    #[test]
    fn reports_text_and_correction() {
        let file = RestraintFile::from_toml(SCENARIO).unwrap();
        let request = RestraintRequest::new(Engine::Somd, CorrectionMethod::Analytical);
        let report = run(&scenario_system(), &file, &request).unwrap();

        assert_eq!(report.restraint_type, RestraintType::Boresch);
        assert!(report.text.starts_with("boresch restraints dictionary = "));
        assert!(report.text.contains("\"kr\":5.00"));
        assert_relative_eq!(report.correction_kcal_per_mol(), -7.1749, epsilon = 1e-3);
        assert_relative_eq!(report.geometry.r, 5.0, epsilon = 1e-12);
        assert!(report.energy_kcal_per_mol() > 0.0);
    }

    #[test]
    fn reference_frame_moves_the_measured_geometry() {
        let file = RestraintFile::from_toml(SCENARIO).unwrap();
        let system = scenario_system();
        let mut frame = system.clone();
        for atom in frame.molecule_mut(1).unwrap().atoms_mut() {
            atom.position.z += 3.0;
        }
        let request = RestraintRequest::new(Engine::Gromacs, CorrectionMethod::SemiAnalytical)
            .with_reference_frame(frame);
        let report = run(&system, &file, &request).unwrap();
        assert_relative_eq!(report.geometry.r, (25.0_f64 + 9.0).sqrt(), epsilon = 1e-12);
        assert!(report.text.starts_with("[ intermolecular_interactions ]"));
    }

    #[test]
    fn reference_frame_read_from_disk_rebinds() {
        let dir = tempfile::tempdir().unwrap();
        let topology = dir.path().join("complex.json");
        JsonTopologyFile::write_system_to_path(&scenario_system(), &topology).unwrap();

        let system = SystemFiles::new(&topology).load().unwrap();
        let mut frame = SystemFiles::new(&topology).load().unwrap();
        for atom in frame.molecule_mut(1).unwrap().atoms_mut() {
            atom.position.z += 3.0;
        }
        let frame_path = dir.path().join("frame.gro");
        GroFile::write_system_to_path(&frame, &frame_path).unwrap();
        let frame = SystemFiles::new(&topology)
            .with_coordinates(&frame_path)
            .load()
            .unwrap();

        let file = RestraintFile::from_toml(SCENARIO).unwrap();
        let request = RestraintRequest::new(Engine::Somd, CorrectionMethod::Analytical)
            .with_reference_frame(frame);
        let report = run(&system, &file, &request).unwrap();
        assert_relative_eq!(report.geometry.r, (25.0_f64 + 9.0).sqrt(), epsilon = 1e-2);
        assert!(report.text.contains("\"l1\":1495"));
    }

    #[test]
    fn invalid_reference_frame_fails() {
        let file = RestraintFile::from_toml(SCENARIO).unwrap();
        let system = scenario_system();
        let mut frame = system.clone();
        frame.molecule_mut(1).unwrap().set_decoupled(false);
        let request = RestraintRequest::new(Engine::Gromacs, CorrectionMethod::Analytical)
            .with_reference_frame(frame);
        assert!(matches!(
            run(&system, &file, &request),
            Err(WorkflowError::Restraint(RestraintError::DecoupledMoleculeCount(0)))
        ));
    }
}
