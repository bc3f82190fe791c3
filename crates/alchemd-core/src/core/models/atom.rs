use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Substring of a force field type that marks an atom as a dummy in a given end state.
pub const DUMMY_TYPE_MARKER: &str = "du";

/// Identifies one of the two endpoint states of an alchemical perturbation.
///
/// State A corresponds to lambda = 0 and state B to lambda = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EndState {
    /// The lambda = 0 endpoint.
    A,
    /// The lambda = 1 endpoint.
    B,
}

impl EndState {
    /// Both end states in canonical order.
    pub const BOTH: [EndState; 2] = [EndState::A, EndState::B];

    /// Maps the conventional `is_lambda1` switch onto an end state.
    pub fn from_lambda1(is_lambda1: bool) -> Self {
        if is_lambda1 { EndState::B } else { EndState::A }
    }

    pub fn is_lambda1(self) -> bool {
        self == EndState::B
    }
}

#[derive(Debug, Error)]
#[error("Invalid end state string")]
pub struct ParseEndStateError;

impl FromStr for EndState {
    type Err = ParseEndStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "0" | "lambda0" => Ok(EndState::A),
            "b" | "1" | "lambda1" => Ok(EndState::B),
            _ => Err(ParseEndStateError),
        }
    }
}

impl fmt::Display for EndState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndState::A => write!(f, "A"),
            EndState::B => write!(f, "B"),
        }
    }
}

/// Chemical identity of an atom in a single end state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndStateProperties {
    /// Element symbol (e.g., "C", "N"); dummies typically carry "Xx".
    pub element: String,
    /// Force field atom type; contains [`DUMMY_TYPE_MARKER`] for dummy atoms.
    pub force_field_type: String,
}

impl EndStateProperties {
    pub fn new(element: &str, force_field_type: &str) -> Self {
        Self {
            element: element.to_string(),
            force_field_type: force_field_type.to_string(),
        }
    }

    /// Returns `true` if the atom is absent-in-effect in this state.
    pub fn is_dummy(&self) -> bool {
        self.force_field_type.contains(DUMMY_TYPE_MARKER)
    }
}

/// The paired per-state properties carried by atoms of a merged molecule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerturbedProperties {
    pub state_a: EndStateProperties,
    pub state_b: EndStateProperties,
}

impl PerturbedProperties {
    pub fn new(state_a: EndStateProperties, state_b: EndStateProperties) -> Self {
        Self { state_a, state_b }
    }

    pub fn state(&self, state: EndState) -> &EndStateProperties {
        match state {
            EndState::A => &self.state_a,
            EndState::B => &self.state_b,
        }
    }
}

/// An atom with its position, optional velocity and, for merged molecules,
/// its paired end-state identity.
///
/// Positions are stored in Angstroms and velocities in Angstroms per picosecond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "C1").
    pub name: String,
    /// The element symbol used when the atom is not perturbed.
    pub element: String,
    /// The force field atom type used when the atom is not perturbed.
    pub force_field_type: String,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Velocity in Angstroms per picosecond, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vector3<f64>>,
    /// End-state properties; present only on atoms of perturbable molecules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<PerturbedProperties>,
}

impl Atom {
    /// Creates a new, unperturbed `Atom` with no velocity and an empty force field type.
    pub fn new(name: &str, element: &str, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element: element.to_string(),
            force_field_type: String::new(),
            position,
            velocity: None,
            perturbation: None,
        }
    }

    pub fn with_force_field_type(mut self, force_field_type: &str) -> Self {
        self.force_field_type = force_field_type.to_string();
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_perturbation(mut self, perturbation: PerturbedProperties) -> Self {
        self.perturbation = Some(perturbation);
        self
    }

    /// Returns the properties of the atom in the requested end state, if it carries any.
    pub fn end_state(&self, state: EndState) -> Option<&EndStateProperties> {
        self.perturbation.as_ref().map(|p| p.state(state))
    }

    /// Returns whether the atom is a dummy in `state`, or `None` for atoms without
    /// end-state properties.
    pub fn is_dummy_in(&self, state: EndState) -> Option<bool> {
        self.end_state(state).map(EndStateProperties::is_dummy)
    }
}
