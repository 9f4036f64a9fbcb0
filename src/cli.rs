use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Train and run a small face emotion classifier")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit the model and save the trained weights
    Train {
        #[arg(long, default_value = "/tmp/emotion-detection")]
        artifact_dir: String,

        /// Training images root (one sub-folder per class); synthetic data
        /// is generated when omitted
        #[arg(long)]
        train_dir: Option<PathBuf>,

        /// Held-out images root (one sub-folder per class)
        #[arg(long)]
        valid_dir: Option<PathBuf>,

        /// Number of synthetic training examples when no folder is given
        #[arg(long, default_value_t = 600)]
        train_size: usize,

        /// Number of synthetic held-out examples when no folder is given
        #[arg(long, default_value_t = 150)]
        valid_size: usize,

        #[arg(long, default_value_t = 40)]
        num_epochs: usize,

        #[arg(long, default_value_t = 16)]
        batch_size: usize,

        #[arg(long, default_value_t = 1e-3)]
        learning_rate: f64,

        #[arg(long, default_value_t = 2)]
        num_workers: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Report held-out loss and accuracy for a trained model
    Evaluate {
        #[arg(long, default_value = "/tmp/emotion-detection")]
        artifact_dir: String,

        /// Evaluation images root (one sub-folder per class); synthetic data
        /// is generated when omitted
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Number of synthetic examples when no folder is given
        #[arg(long, default_value_t = 150)]
        data_size: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Score a single image with a trained model
    Infer {
        #[arg(long, default_value = "/tmp/emotion-detection")]
        artifact_dir: String,

        /// Path of the image to classify
        image: PathBuf,
    },

    /// Print the layer table of the model
    Summary {
        /// Uses this model's saved config when it exists, defaults otherwise
        #[arg(long, default_value = "/tmp/emotion-detection")]
        artifact_dir: String,
    },

    /// Write the layer graph as Graphviz DOT (and PNG when `dot` is installed)
    Plot {
        /// Uses this model's saved config when it exists, defaults otherwise
        #[arg(long, default_value = "/tmp/emotion-detection")]
        artifact_dir: String,

        #[arg(long, default_value = "emotion_model.dot")]
        output: PathBuf,
    },
}
