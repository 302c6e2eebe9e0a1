use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::errors::{DomainError, DomainResult};

/// Hyperparameters and inputs handed to the external trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub model: String,
    pub data: PathBuf,
    pub epochs: u32,
    pub imgsz: u32,
    pub batch: u32,
    pub device: Option<String>,
    pub project: Option<String>,
    pub name: Option<String>,
}

impl TrainingPlan {
    pub fn new(data: impl Into<PathBuf>) -> Self {
        Self {
            model: "yolo12n.pt".to_string(),
            data: data.into(),
            epochs: 100,
            imgsz: 640,
            batch: 8,
            device: None,
            project: None,
            name: None,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.model.trim().is_empty() {
            return Err(DomainError::InvalidInput("model must not be empty".into()));
        }
        if self.epochs == 0 {
            return Err(DomainError::InvalidInput("epochs must be > 0".into()));
        }
        if self.batch == 0 {
            return Err(DomainError::InvalidInput("batch must be > 0".into()));
        }
        if self.imgsz == 0 || self.imgsz % 32 != 0 {
            return Err(DomainError::InvalidInput(format!(
                "imgsz must be a positive multiple of 32, got {}",
                self.imgsz
            )));
        }
        Ok(())
    }
}

/// Class names as written in `data.yaml`: either a list or an index map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

impl ClassNames {
    pub fn len(&self) -> usize {
        match self {
            ClassNames::List(v) => v.len(),
            ClassNames::Map(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ClassNames::List(v) => v.clone(),
            ClassNames::Map(m) => m.values().cloned().collect(),
        }
    }
}

/// Ultralytics dataset descriptor (`data.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub train: Option<String>,
    #[serde(default)]
    pub val: Option<String>,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub nc: Option<usize>,
    pub names: ClassNames,
}

impl DatasetDescriptor {
    pub fn validate(&self) -> DomainResult<()> {
        if self.train.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(DomainError::InvalidInput("dataset descriptor has no `train` split".into()));
        }
        if self.val.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(DomainError::InvalidInput("dataset descriptor has no `val` split".into()));
        }
        if self.names.is_empty() {
            return Err(DomainError::InvalidInput("dataset descriptor lists no class names".into()));
        }
        if let Some(nc) = self.nc {
            if nc != self.names.len() {
                return Err(DomainError::InvalidInput(format!(
                    "nc = {} but {} class names are listed",
                    nc,
                    self.names.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let plan = TrainingPlan::new("data.yaml");
        assert_eq!(plan.model, "yolo12n.pt");
        assert_eq!((plan.epochs, plan.imgsz, plan.batch), (100, 640, 8));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        let mut plan = TrainingPlan::new("data.yaml");
        plan.epochs = 0;
        assert!(plan.validate().is_err());
        let mut plan = TrainingPlan::new("data.yaml");
        plan.imgsz = 650;
        assert!(plan.validate().is_err());
        let mut plan = TrainingPlan::new("data.yaml");
        plan.batch = 0;
        assert!(plan.validate().is_err());
    }

    #[test]
    fn descriptor_checks_class_count() {
        let desc = DatasetDescriptor {
            path: None,
            train: Some("train/images".into()),
            val: Some("valid/images".into()),
            test: None,
            nc: Some(3),
            names: ClassNames::List(vec!["bottle".into(), "net".into()]),
        };
        assert!(desc.validate().is_err());
        let desc = DatasetDescriptor { nc: Some(2), ..desc };
        assert!(desc.validate().is_ok());
    }
}
