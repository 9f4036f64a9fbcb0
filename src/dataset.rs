use std::path::Path;

use burn::data::dataset::vision::{Annotation, ImageDatasetItem, ImageFolderDataset, PixelDepth};
use burn::data::dataset::{Dataset, InMemDataset};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Image width expected by the model.
pub const WIDTH: usize = 64;
/// Image height expected by the model.
pub const HEIGHT: usize = 64;
/// Number of color channels (RGB).
pub const CHANNELS: usize = 3;

/// Class names, indexed by label value.
pub const CLASSES: [&str; 2] = ["not_happy", "happy"];

/// A single labeled face image, stored as raw HWC bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaceItem {
    /// Raw pixel intensities in [0, 255], row-major HWC order.
    pub pixels: Vec<u8>,
    /// Binary class label: 0 = not happy, 1 = happy.
    pub label: i64,
}

enum Source {
    Folder(ImageFolderDataset),
    Memory(InMemDataset<FaceItem>),
}

/// The labeled face dataset.
///
/// Images can come from a folder-per-class directory layout
/// (`<root>/not_happy/*.png`, `<root>/happy/*.png`, each image 64x64 RGB)
/// or from an in-memory synthetic source used for smoke runs and tests.
pub struct FaceDataset {
    source: Source,
}

impl FaceDataset {
    /// Load a dataset split from a root folder with one sub-folder per class.
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let mut items = Vec::new();
        for class in CLASSES {
            let dir = root.join(class);
            let mut paths = std::fs::read_dir(&dir)
                .unwrap_or_else(|err| panic!("Class folder {} should be readable: {err}", dir.display()))
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .collect::<Vec<_>>();
            paths.sort();
            items.extend(paths.into_iter().map(|path| (path, class.to_string())));
        }

        let dataset = ImageFolderDataset::new_classification_with_items(items, &CLASSES)
            .expect("Image folder dataset should be created from the class folders");

        Self {
            source: Source::Folder(dataset),
        }
    }

    /// Wrap a list of items as an in-memory dataset.
    pub fn from_items(items: Vec<FaceItem>) -> Self {
        Self {
            source: Source::Memory(InMemDataset::new(items)),
        }
    }

    /// Generate a deterministic in-memory dataset.
    ///
    /// "Happy" examples are bright and "not happy" examples are dark, so a
    /// classifier can actually separate the two classes when fitted.
    pub fn synthetic(len: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let items = (0..len)
            .map(|i| {
                let label = (i % 2) as i64;
                let base: u8 = if label == 1 {
                    rng.random_range(160..=230)
                } else {
                    rng.random_range(20..=90)
                };
                let pixels = (0..WIDTH * HEIGHT * CHANNELS)
                    .map(|_| base.saturating_add(rng.random_range(0..=25)))
                    .collect();
                FaceItem { pixels, label }
            })
            .collect();

        Self {
            source: Source::Memory(InMemDataset::new(items)),
        }
    }
}

impl Dataset<FaceItem> for FaceDataset {
    fn get(&self, index: usize) -> Option<FaceItem> {
        match &self.source {
            Source::Folder(dataset) => dataset.get(index).map(face_item_from_image),
            Source::Memory(dataset) => dataset.get(index),
        }
    }

    fn len(&self) -> usize {
        match &self.source {
            Source::Folder(dataset) => dataset.len(),
            Source::Memory(dataset) => dataset.len(),
        }
    }
}

fn face_item_from_image(item: ImageDatasetItem) -> FaceItem {
    // Face images are 8-bit RGB
    let pixels = item
        .image
        .into_iter()
        .map(|p: PixelDepth| -> u8 { p.try_into().unwrap() })
        .collect();

    let label = match item.annotation {
        Annotation::Label(y) => y as i64,
        _ => panic!("Expected a class label annotation"),
    };

    FaceItem { pixels, label }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_has_requested_length() {
        let dataset = FaceDataset::synthetic(10, 7);
        assert_eq!(dataset.len(), 10);
    }

    #[test]
    fn synthetic_items_have_expected_shape_and_labels() {
        let dataset = FaceDataset::synthetic(6, 3);
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            assert_eq!(item.pixels.len(), WIDTH * HEIGHT * CHANNELS);
            assert!(item.label == 0 || item.label == 1);
        }
    }

    #[test]
    fn synthetic_is_deterministic_under_seed() {
        let a = FaceDataset::synthetic(4, 11).get(2).unwrap();
        let b = FaceDataset::synthetic(4, 11).get(2).unwrap();
        assert_eq!(a.pixels, b.pixels);
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn folder_classes_map_to_expected_labels() {
        let root = std::env::temp_dir().join("emotion-detection-dataset-test");
        std::fs::remove_dir_all(&root).ok();
        for class in CLASSES {
            std::fs::create_dir_all(root.join(class)).unwrap();
        }
        image::RgbImage::from_pixel(64, 64, image::Rgb([10, 10, 10]))
            .save(root.join("not_happy/dark.png"))
            .unwrap();
        image::RgbImage::from_pixel(64, 64, image::Rgb([240, 240, 240]))
            .save(root.join("happy/bright.png"))
            .unwrap();

        let dataset = FaceDataset::from_dir(&root);
        assert_eq!(dataset.len(), 2);

        // Label 1 must mean "happy" regardless of the folders' alphabetical
        // order, so identify each item by its contents.
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            assert_eq!(item.pixels.len(), WIDTH * HEIGHT * CHANNELS);
            let bright = item.pixels.iter().all(|&p| p > 128);
            assert_eq!(item.label, i64::from(bright));
        }

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn synthetic_classes_are_separable_by_brightness() {
        let dataset = FaceDataset::synthetic(8, 5);
        let mean = |item: &FaceItem| {
            item.pixels.iter().map(|&p| p as u64).sum::<u64>() / item.pixels.len() as u64
        };
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            if item.label == 1 {
                assert!(mean(&item) > 128);
            } else {
                assert!(mean(&item) < 128);
            }
        }
    }
}
