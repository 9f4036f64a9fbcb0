use std::sync::Arc;

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
};

use crate::{
    data::{FaceBatch, FaceBatcher},
    dataset::FaceDataset,
    model::{EmotionModel, EmotionModelConfig},
};

#[derive(Config)]
pub struct TrainingConfig {
    pub model: EmotionModelConfig,
    pub optimizer: AdamConfig,

    #[config(default = 40)]
    pub num_epochs: usize,
    #[config(default = 16)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 1e-3)]
    pub learning_rate: f64,
}

fn create_artifact_dir(artifact_dir: &str) {
    // Remove existing artifacts
    std::fs::remove_dir_all(artifact_dir).ok();
    std::fs::create_dir_all(artifact_dir).ok();
}

/// Dataset sizes and image shape, reported once before fitting starts.
fn shape_banner(num_train: usize, num_valid: usize, model: &EmotionModelConfig) -> String {
    format!(
        "number of training examples = {num_train}\n\
         number of validation examples = {num_valid}\n\
         image shape = ({}, {}, {})",
        model.height, model.width, model.channels,
    )
}

/// Load the model config saved next to the trained weights, falling back to
/// the defaults when no training artifacts exist yet.
pub fn load_model_config(artifact_dir: &str) -> EmotionModelConfig {
    TrainingConfig::load(format!("{artifact_dir}/config.json"))
        .map(|config| config.model)
        .unwrap_or_else(|_| EmotionModelConfig::new())
}

/// Build a data loader suitable for evaluation or inference.
pub fn batch_loader<B: Backend>(
    dataset: FaceDataset,
    batch_size: usize,
) -> Arc<dyn DataLoader<B, FaceBatch<B>>> {
    DataLoaderBuilder::new(FaceBatcher::new())
        .batch_size(batch_size)
        .build(dataset)
}

/// Fit the model against the training split, reporting held-out loss and
/// accuracy after every epoch.
///
/// The loop is a plain mini-batch gradient descent driver: forward, binary
/// cross-entropy on the logits, backward, optimizer step. There is no early
/// stopping and no convergence criterion; it runs for exactly
/// `config.num_epochs` passes. The trained weights and the config are saved
/// under `artifact_dir`.
pub fn train<B: AutodiffBackend>(
    artifact_dir: &str,
    config: TrainingConfig,
    dataset_train: FaceDataset,
    dataset_valid: FaceDataset,
    device: B::Device,
) -> EmotionModel<B> {
    create_artifact_dir(artifact_dir);
    config
        .save(format!("{artifact_dir}/config.json"))
        .expect("Config should be saved successfully");

    B::seed(config.seed);

    println!(
        "{}",
        shape_banner(dataset_train.len(), dataset_valid.len(), &config.model)
    );

    let mut model: EmotionModel<B> = config.model.init(&device);
    let mut optim = config.optimizer.init::<B, EmotionModel<B>>();
    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&device);

    let dataloader_train = DataLoaderBuilder::new(FaceBatcher::new())
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_valid = batch_loader::<B::InnerBackend>(dataset_valid, config.batch_size);

    let train_num_items = dataloader_train.num_items();

    for epoch in 1..=config.num_epochs {
        let mut train_loss = 0.0f64;

        for batch in dataloader_train.iter() {
            let batch_size = batch.images.dims()[0];
            let logits = model.forward(batch.images).flatten::<1>(0, 1);
            let loss = loss_fn.forward(logits, batch.targets);
            train_loss += loss.clone().into_scalar().elem::<f64>() * batch_size as f64;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(config.learning_rate, model, grads);
        }

        let avg_train_loss = train_loss / train_num_items as f64;
        let (valid_loss, valid_accuracy) = evaluate(&model.valid(), dataloader_valid.as_ref());

        println!(
            "Epoch {epoch}/{} - train loss {avg_train_loss:.4}, valid loss {valid_loss:.4}, valid accuracy {valid_accuracy:.4}",
            config.num_epochs,
        );
    }

    model
        .clone()
        .save_file(format!("{artifact_dir}/model"), &CompactRecorder::new())
        .expect("Trained model should be saved successfully");

    model
}

/// Run the model over the held-out split in evaluation mode.
///
/// Returns the averaged binary cross-entropy loss and the fraction of
/// examples whose thresholded score matches the target.
pub fn evaluate<B: Backend>(
    model: &EmotionModel<B>,
    loader: &dyn DataLoader<B, FaceBatch<B>>,
) -> (f64, f64) {
    let device = model.devices()[0].clone();
    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&device);

    let mut total_loss = 0.0f64;
    let mut num_correct = 0.0f64;
    let mut num_items = 0usize;

    for batch in loader.iter() {
        let batch_size = batch.images.dims()[0];
        let logits = model.forward(batch.images).flatten::<1>(0, 1);
        let loss = loss_fn.forward(logits.clone(), batch.targets.clone());
        total_loss += loss.into_scalar().elem::<f64>() * batch_size as f64;

        // A sigmoid score above 0.5 is a positive logit.
        let predictions = logits.greater_elem(0.0).int();
        num_correct += predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<f64>();
        num_items += batch_size;
    }

    (total_loss / num_items as f64, num_correct / num_items as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;
    type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

    fn artifact_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("emotion-detection-test-{name}"));
        dir.to_string_lossy().into_owned()
    }

    #[test]
    fn shape_banner_reports_counts_and_image_shape() {
        let banner = shape_banner(600, 150, &EmotionModelConfig::new());

        assert!(banner.contains("number of training examples = 600"));
        assert!(banner.contains("number of validation examples = 150"));
        assert!(banner.contains("image shape = (64, 64, 3)"));
    }

    #[test]
    fn load_model_config_prefers_saved_artifacts() {
        let dir = artifact_dir("saved-config");
        std::fs::create_dir_all(&dir).ok();
        let config = TrainingConfig::new(
            EmotionModelConfig::new().with_num_filters(8),
            AdamConfig::new(),
        );
        config.save(format!("{dir}/config.json")).unwrap();

        let loaded = load_model_config(&dir);
        assert_eq!(loaded.num_filters, 8);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_model_config_falls_back_to_defaults() {
        let dir = artifact_dir("no-config");
        std::fs::remove_dir_all(&dir).ok();

        let loaded = load_model_config(&dir);
        assert_eq!(loaded.num_filters, EmotionModelConfig::new().num_filters);
    }

    #[test]
    fn evaluate_returns_loss_and_accuracy() {
        let device = Default::default();
        let model = EmotionModelConfig::new().init::<TestBackend>(&device);
        let loader = batch_loader::<TestBackend>(FaceDataset::synthetic(12, 1), 4);

        let (loss, accuracy) = evaluate(&model, loader.as_ref());

        assert!(loss.is_finite());
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn evaluate_accuracy_stays_in_the_open_interval_on_ambiguous_data() {
        // Identical images with alternating labels: whatever the model
        // predicts, exactly half of the examples match.
        let device = Default::default();
        let items = (0..8)
            .map(|i| crate::dataset::FaceItem {
                pixels: vec![128u8; crate::dataset::WIDTH * crate::dataset::HEIGHT * crate::dataset::CHANNELS],
                label: (i % 2) as i64,
            })
            .collect();

        let model = EmotionModelConfig::new().init::<TestBackend>(&device);
        let loader = batch_loader::<TestBackend>(FaceDataset::from_items(items), 4);
        let (loss, accuracy) = evaluate(&model, loader.as_ref());

        assert!(!loss.is_nan());
        assert!(accuracy > 0.0 && accuracy < 1.0);
        assert_eq!(accuracy, 0.5);
    }

    #[test]
    fn training_runs_end_to_end() {
        let dir = artifact_dir("train");
        let device = Default::default();
        let config = TrainingConfig::new(EmotionModelConfig::new(), AdamConfig::new())
            .with_num_epochs(1)
            .with_batch_size(8)
            .with_num_workers(1)
            .with_learning_rate(1e-2);

        let model = train::<TestAutodiffBackend>(
            &dir,
            config,
            FaceDataset::synthetic(16, 2),
            FaceDataset::synthetic(8, 3),
            device,
        );

        let loader = batch_loader::<TestBackend>(FaceDataset::synthetic(8, 4), 8);
        let (loss, accuracy) = evaluate(&model.valid(), loader.as_ref());

        assert!(loss.is_finite());
        assert!((0.0..=1.0).contains(&accuracy));
        assert!(std::path::Path::new(&format!("{dir}/config.json")).exists());
        assert!(std::path::Path::new(&format!("{dir}/model.mpk")).exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
