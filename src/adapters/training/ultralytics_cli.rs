use std::process::{Command, Stdio};
use tracing::{error, info};

use crate::application::ports::TrainerPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::training::TrainingPlan;

/// Runs `yolo detect train ...` and waits for it.
#[derive(Debug, Clone)]
pub struct UltralyticsCli {
    program: String,
}

impl UltralyticsCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn args(plan: &TrainingPlan) -> Vec<String> {
        let mut args = vec![
            "detect".to_string(),
            "train".to_string(),
            format!("model={}", plan.model),
            format!("data={}", plan.data.display()),
            format!("epochs={}", plan.epochs),
            format!("imgsz={}", plan.imgsz),
            format!("batch={}", plan.batch),
        ];
        if let Some(device) = &plan.device {
            args.push(format!("device={device}"));
        }
        if let Some(project) = &plan.project {
            args.push(format!("project={project}"));
        }
        if let Some(name) = &plan.name {
            args.push(format!("name={name}"));
        }
        args
    }
}

impl Default for UltralyticsCli {
    fn default() -> Self {
        Self::new("yolo")
    }
}

impl TrainerPort for UltralyticsCli {
    fn describe(&self, plan: &TrainingPlan) -> String {
        let mut line = self.program.clone();
        for arg in Self::args(plan) {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push_str(&format!("\"{arg}\""));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    fn train(&self, plan: &TrainingPlan) -> DomainResult<()> {
        let mut child = Command::new(&self.program)
            .args(Self::args(plan))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                error!("failed to start {}: {}", self.program, e);
                DomainError::OperationFailed(format!(
                    "could not start `{}` (is the ultralytics package installed?): {e}",
                    self.program
                ))
            })?;

        let status = child
            .wait()
            .map_err(|e| DomainError::OperationFailed(format!("waiting for trainer: {e}")))?;
        if !status.success() {
            return Err(DomainError::OperationFailed(format!("trainer exited with {status}")));
        }
        info!("training finished");
        Ok(())
    }
}
