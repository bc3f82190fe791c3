use super::boresch::{
    BoreschAnchors, BoreschEquilibrium, BoreschForceConstants, BoreschGeometry, BoreschParameters,
};
use super::error::RestraintError;
use super::{Restraint, RestraintType, check_binding};
use crate::core::models::system::MolecularSystem;
use crate::core::units::Quantity;
use crate::engine::config::ConfigError;
use tracing::debug;

#[derive(Debug, Clone, Default)]
enum EquilibriumSource {
    #[default]
    Unset,
    Given(BoreschEquilibrium),
    Measured,
}

#[derive(Debug, Clone, Default)]
pub struct BoreschRestraintBuilder {
    anchors: Option<BoreschAnchors>,
    equilibrium: EquilibriumSource,
    force_constants: Option<BoreschForceConstants>,
    temperature: Option<Quantity>,
    restraint_type: Option<RestraintType>,
}

impl BoreschRestraintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchors(mut self, anchors: BoreschAnchors) -> Self {
        self.anchors = Some(anchors);
        self
    }

    pub fn equilibrium(mut self, equilibrium: BoreschEquilibrium) -> Self {
        self.equilibrium = EquilibriumSource::Given(equilibrium);
        self
    }

    /// Takes the equilibrium values from the anchor geometry of the system
    /// passed to [`build`](Self::build).
    pub fn equilibrium_from_system(mut self) -> Self {
        self.equilibrium = EquilibriumSource::Measured;
        self
    }

    pub fn force_constants(mut self, force_constants: BoreschForceConstants) -> Self {
        self.force_constants = Some(force_constants);
        self
    }

    pub fn temperature(mut self, temperature: Quantity) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn restraint_type(mut self, restraint_type: RestraintType) -> Self {
        self.restraint_type = Some(restraint_type);
        self
    }

    pub fn build(self, system: &MolecularSystem) -> Result<Restraint, RestraintError> {
        let anchors = self
            .anchors
            .ok_or(ConfigError::MissingParameter("anchors"))?;
        let force_constants = self
            .force_constants
            .ok_or(ConfigError::MissingParameter("force_constants"))?;
        let temperature = self
            .temperature
            .ok_or(ConfigError::MissingParameter("temperature"))?;
        let equilibrium = match self.equilibrium {
            EquilibriumSource::Given(equilibrium) => equilibrium,
            EquilibriumSource::Measured => {
                check_binding(system, &anchors)?;
                let geometry = BoreschGeometry::measure(system, &anchors)?;
                debug!(?geometry, "Using measured anchor geometry as equilibrium.");
                geometry.to_equilibrium()
            }
            EquilibriumSource::Unset => {
                return Err(ConfigError::MissingParameter("equilibrium").into());
            }
        };

        Restraint::new(
            system,
            BoreschParameters::new(anchors, equilibrium, force_constants),
            temperature,
            self.restraint_type.unwrap_or_default(),
        )
    }
}
