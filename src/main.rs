use burn::{
    module::Module,
    optim::AdamConfig,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use clap::Parser;
use emotion_detection::{
    cli::{Cli, Commands},
    dataset::FaceDataset,
    inference,
    model::{EmotionModel, EmotionModelConfig},
    plot,
    training::{self, TrainingConfig},
};

fn launch<B: AutodiffBackend>(cli: Cli, device: B::Device) {
    match cli.command {
        Commands::Train {
            artifact_dir,
            train_dir,
            valid_dir,
            train_size,
            valid_size,
            num_epochs,
            batch_size,
            learning_rate,
            num_workers,
            seed,
        } => {
            let dataset_train = match train_dir {
                Some(dir) => FaceDataset::from_dir(dir),
                None => FaceDataset::synthetic(train_size, seed),
            };
            let dataset_valid = match valid_dir {
                Some(dir) => FaceDataset::from_dir(dir),
                None => FaceDataset::synthetic(valid_size, seed + 1),
            };

            let config = TrainingConfig::new(EmotionModelConfig::new(), AdamConfig::new())
                .with_num_epochs(num_epochs)
                .with_batch_size(batch_size)
                .with_learning_rate(learning_rate)
                .with_num_workers(num_workers)
                .with_seed(seed);

            training::train::<B>(&artifact_dir, config, dataset_train, dataset_valid, device);
        }

        Commands::Evaluate {
            artifact_dir,
            data_dir,
            data_size,
            seed,
        } => {
            let config = TrainingConfig::load(format!("{artifact_dir}/config.json"))
                .expect("Config should exist for the model; run train first");
            let record = CompactRecorder::new()
                .load(format!("{artifact_dir}/model").into(), &device)
                .expect("Trained model should exist; run train first");
            let model: EmotionModel<B::InnerBackend> =
                config.model.init(&device).load_record(record);

            let dataset = match data_dir {
                Some(dir) => FaceDataset::from_dir(dir),
                None => FaceDataset::synthetic(data_size, seed),
            };
            let loader = training::batch_loader::<B::InnerBackend>(dataset, config.batch_size);
            let (loss, accuracy) = training::evaluate(&model, loader.as_ref());

            println!("Loss = {loss:.4}");
            println!("Test Accuracy = {accuracy:.4}");
        }

        Commands::Infer {
            artifact_dir,
            image,
        } => {
            inference::infer::<B::InnerBackend>(&artifact_dir, device, &image);
        }

        Commands::Summary { artifact_dir } => {
            let config = training::load_model_config(&artifact_dir);
            let model: EmotionModel<B::InnerBackend> = config.init(&device);
            print!("{}", model.summary(&config));
        }

        Commands::Plot {
            artifact_dir,
            output,
        } => {
            let config = training::load_model_config(&artifact_dir);
            match plot::render(&config, &output) {
                Some(png) => println!("Rendered model graph to {}", png.display()),
                None => println!("Wrote model graph to {}", output.display()),
            }
        }
    }
}

#[cfg(any(
    feature = "ndarray",
    feature = "ndarray-blas-accelerate",
    feature = "ndarray-blas-netlib",
    feature = "ndarray-blas-openblas",
))]
mod ndarray {
    use burn::backend::{
        ndarray::{NdArray, NdArrayDevice},
        Autodiff,
    };
    use emotion_detection::cli::Cli;

    pub fn run(cli: Cli) {
        let device = NdArrayDevice::Cpu;
        super::launch::<Autodiff<NdArray>>(cli, device);
    }
}

#[cfg(feature = "tch-cpu")]
mod tch_cpu {
    use burn::backend::{
        libtorch::{LibTorch, LibTorchDevice},
        Autodiff,
    };
    use emotion_detection::cli::Cli;

    pub fn run(cli: Cli) {
        let device = LibTorchDevice::Cpu;
        super::launch::<Autodiff<LibTorch>>(cli, device);
    }
}

#[cfg(feature = "tch-gpu")]
mod tch_gpu {
    use burn::backend::{
        libtorch::{LibTorch, LibTorchDevice},
        Autodiff,
    };
    use emotion_detection::cli::Cli;

    pub fn run(cli: Cli) {
        #[cfg(not(target_os = "macos"))]
        let device = LibTorchDevice::Cuda(0);
        #[cfg(target_os = "macos")]
        let device = LibTorchDevice::Mps;
        super::launch::<Autodiff<LibTorch>>(cli, device);
    }
}

#[cfg(feature = "wgpu")]
mod wgpu {
    use burn::backend::{
        wgpu::{Wgpu, WgpuDevice},
        Autodiff,
    };
    use emotion_detection::cli::Cli;

    pub fn run(cli: Cli) {
        let device = WgpuDevice::default();
        super::launch::<Autodiff<Wgpu>>(cli, device);
    }
}

fn main() {
    let cli = Cli::parse();
    #[cfg(any(
        feature = "ndarray",
        feature = "ndarray-blas-accelerate",
        feature = "ndarray-blas-netlib",
        feature = "ndarray-blas-openblas",
    ))]
    ndarray::run(cli);
    #[cfg(feature = "tch-cpu")]
    tch_cpu::run(cli);
    #[cfg(feature = "tch-gpu")]
    tch_gpu::run(cli);
    #[cfg(feature = "wgpu")]
    wgpu::run(cli);
}
