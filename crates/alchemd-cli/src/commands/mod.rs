pub mod restraint;
pub mod squash;
pub mod unsquash;

use crate::cli::SystemInput;
use alchemd::workflows::squash::SystemFiles;

impl From<&SystemInput> for SystemFiles {
    fn from(input: &SystemInput) -> Self {
        let files = SystemFiles::new(&input.topology);
        match &input.coordinates {
            Some(coordinates) => files.with_coordinates(coordinates),
            None => files,
        }
    }
}
