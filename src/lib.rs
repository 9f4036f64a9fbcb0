//! A small binary image classifier for face emotion detection.
//!
//! The crate is a linear workflow around Burn: load a labeled face dataset,
//! rescale pixels into [0, 1], assemble a fixed convolutional topology,
//! fit it with Adam and a binary cross-entropy loss, evaluate it to a
//! (loss, accuracy) pair, and score single images with the trained weights.

pub mod cli;
pub mod data;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod plot;
pub mod training;
