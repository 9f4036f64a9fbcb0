use std::path::Path;

use burn::{
    data::dataloader::batcher::Batcher,
    module::Module,
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use image::imageops::FilterType;

use crate::{
    data::FaceBatcher,
    dataset::{FaceItem, CLASSES},
    model::EmotionModel,
    training::TrainingConfig,
};

/// Decode a single image from disk and shape it like a training example.
///
/// The image is resized to the model's input size and kept as raw bytes;
/// the batcher applies the same [0, 1] rescaling as during training. The
/// label is a placeholder, inference never reads it.
pub fn load_face_item<P: AsRef<Path>>(path: P, height: usize, width: usize) -> FaceItem {
    let img = image::open(path.as_ref()).unwrap_or_else(|err| {
        panic!("Image {} should be readable: {err}", path.as_ref().display())
    });
    let pixels = img
        .resize_exact(width as u32, height as u32, FilterType::Triangle)
        .into_rgb8()
        .into_raw();

    FaceItem { pixels, label: 0 }
}

/// Run a forward pass of the trained model over one image file.
///
/// Returns the sigmoid score: close to 1.0 means "happy".
pub fn infer<B: Backend>(artifact_dir: &str, device: B::Device, image_path: &Path) -> f32 {
    let config = TrainingConfig::load(format!("{artifact_dir}/config.json"))
        .expect("Config should exist for the model; run train first");
    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), &device)
        .expect("Trained model should exist; run train first");
    let model: EmotionModel<B> = config.model.init(&device).load_record(record);

    let item = load_face_item(image_path, config.model.height, config.model.width);
    let batch = FaceBatcher::new().batch(vec![item], &device);
    let score = model.infer(batch.images).into_scalar().elem::<f32>();

    let predicted = usize::from(score > 0.5);
    println!("Predicted {score:.4} -> {}", CLASSES[predicted]);

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmotionModelConfig;
    use burn::optim::AdamConfig;

    type TestBackend = burn::backend::NdArray;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("emotion-detection-infer-{name}"))
    }

    fn write_test_image(path: &Path, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 180, 160]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn loaded_item_matches_model_input_shape() {
        let path = temp_path("resize.png");
        write_test_image(&path, 32, 48);

        let item = load_face_item(&path, 64, 64);
        assert_eq!(item.pixels.len(), 64 * 64 * 3);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn infer_scores_a_saved_model() {
        let dir = temp_path("artifacts");
        let dir = dir.to_string_lossy();
        std::fs::create_dir_all(&*dir).ok();

        let device = Default::default();
        let config = TrainingConfig::new(EmotionModelConfig::new(), AdamConfig::new());
        config.save(format!("{dir}/config.json")).unwrap();
        let model: EmotionModel<TestBackend> = config.model.init(&device);
        model
            .save_file(format!("{dir}/model"), &CompactRecorder::new())
            .unwrap();

        let image_path = temp_path("face.png");
        write_test_image(&image_path, 64, 64);

        let score = infer::<TestBackend>(&dir, device, &image_path);
        assert!(score > 0.0 && score < 1.0);

        std::fs::remove_file(&image_path).ok();
        std::fs::remove_dir_all(&*dir).ok();
    }
}
