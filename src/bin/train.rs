//! Training launcher: validates the dataset and hyperparameters, then hands
//! the run to the Ultralytics CLI.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use debris_detect::adapters::training::{dataset::YamlDatasetRepo, ultralytics_cli::UltralyticsCli};
use debris_detect::application::services::TrainingService;
use debris_detect::domain::training::TrainingPlan;

#[derive(Debug, Parser)]
#[command(name = "train", version, about = "Train a YOLO detector on a local dataset")]
struct TrainArgs {
    /// Starting weights (.pt) or model config (.yaml).
    #[arg(long, default_value = "yolo12n.pt")]
    model: String,

    /// Dataset descriptor (data.yaml).
    #[arg(long, env = "TRAIN_DATA")]
    data: PathBuf,

    #[arg(long, default_value_t = 100)]
    epochs: u32,

    #[arg(long, default_value_t = 640)]
    imgsz: u32,

    #[arg(long, default_value_t = 8)]
    batch: u32,

    /// e.g. `0`, `0,1` or `cpu`.
    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    name: Option<String>,

    /// Trainer executable.
    #[arg(long, env = "YOLO_BIN", default_value = "yolo")]
    yolo_bin: String,

    /// Validate and print the command without running it.
    #[arg(long)]
    dry_run: bool,
}

impl TrainArgs {
    fn plan(&self) -> TrainingPlan {
        TrainingPlan {
            model: self.model.clone(),
            data: self.data.clone(),
            epochs: self.epochs,
            imgsz: self.imgsz,
            batch: self.batch,
            device: self.device.clone(),
            project: self.project.clone(),
            name: self.name.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    debris_detect::init_tracing();

    let args = TrainArgs::parse();
    let plan = args.plan();
    let service = TrainingService::new(
        Arc::new(YamlDatasetRepo::new()),
        Arc::new(UltralyticsCli::new(args.yolo_bin.clone())),
    );

    if args.dry_run {
        let descriptor = service.prepare(&plan)?;
        tracing::info!("dataset ok: {} classes [{}]", descriptor.names.len(), descriptor.names.to_vec().join(", "));
        println!("{}", service.command_line(&plan));
        return Ok(());
    }

    service.run(&plan)?;
    Ok(())
}
