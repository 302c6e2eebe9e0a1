use crate::application::ports::DatasetRepoPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::training::{DatasetDescriptor, TrainingPlan};

/// Reads the Ultralytics `data.yaml` named by the plan.
#[derive(Debug, Default)]
pub struct YamlDatasetRepo;

impl YamlDatasetRepo {
    pub fn new() -> Self { Self }
}

impl DatasetRepoPort for YamlDatasetRepo {
    fn load(&self, plan: &TrainingPlan) -> DomainResult<DatasetDescriptor> {
        let path = &plan.data;
        if !path.is_file() {
            return Err(DomainError::NotFound(format!("dataset descriptor not found: {}", path.display())));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| DomainError::OperationFailed(format!("reading {}: {e}", path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|e| DomainError::InvalidInput(format!("malformed {}: {e}", path.display())))
    }
}
