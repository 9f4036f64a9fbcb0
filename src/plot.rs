use std::path::{Path, PathBuf};
use std::process::Command;

use crate::model::EmotionModelConfig;

/// Describe the layer graph in Graphviz DOT format.
///
/// The string can be pasted into any Graphviz viewer or rendered with the
/// `dot` command line tool.
pub fn to_dot(config: &EmotionModelConfig) -> String {
    let [conv_h, conv_w] = config.conv_output();
    let [pool_h, pool_w] = config.pooled_output();
    let nodes = [
        (
            "input",
            format!(
                "input\\n[N, {}, {}, {}]",
                config.channels, config.height, config.width
            ),
        ),
        (
            "zero_pad",
            format!(
                "zero_pad ({0}, {0})\\n[N, {1}, {2}, {3}]",
                config.padding,
                config.channels,
                config.height + 2 * config.padding,
                config.width + 2 * config.padding,
            ),
        ),
        (
            "conv0",
            format!(
                "conv0 {0}x{0}, {1} filters\\n[N, {1}, {conv_h}, {conv_w}]",
                config.kernel_size, config.num_filters,
            ),
        ),
        (
            "bn0",
            format!("bn0\\n[N, {}, {conv_h}, {conv_w}]", config.num_filters),
        ),
        (
            "relu",
            format!("relu\\n[N, {}, {conv_h}, {conv_w}]", config.num_filters),
        ),
        (
            "max_pool",
            format!(
                "max_pool {0}x{0}\\n[N, {1}, {pool_h}, {pool_w}]",
                config.pool_size, config.num_filters,
            ),
        ),
        ("flatten", format!("flatten\\n[N, {}]", config.fc_features())),
        ("fc", "fc, sigmoid\\n[N, 1]".to_string()),
    ];

    let mut dot = String::new();
    dot.push_str("digraph EmotionModel {\n");
    dot.push_str("    rankdir=TB;\n");
    dot.push_str("    node [shape=box, fontname=\"Arial\"];\n");
    for (name, label) in &nodes {
        dot.push_str(&format!("    {name} [label=\"{label}\"];\n"));
    }
    for pair in nodes.windows(2) {
        dot.push_str(&format!("    {} -> {};\n", pair[0].0, pair[1].0));
    }
    dot.push_str("}\n");
    dot
}

/// Write the layer graph to a `.dot` file and, when the Graphviz `dot`
/// layout tool is installed, render it to a PNG next to it.
///
/// Returns the path of the rendered PNG, or `None` when only the `.dot`
/// file was written.
pub fn render<P: AsRef<Path>>(config: &EmotionModelConfig, dot_path: P) -> Option<PathBuf> {
    let dot_path = dot_path.as_ref();
    std::fs::write(dot_path, to_dot(config)).unwrap_or_else(|err| {
        panic!("Graph file {} should be writable: {err}", dot_path.display())
    });

    let png_path = dot_path.with_extension("png");
    let rendered = Command::new("dot")
        .arg("-Tpng")
        .arg(dot_path)
        .arg("-o")
        .arg(&png_path)
        .status();

    match rendered {
        Ok(status) if status.success() => Some(png_path),
        _ => {
            println!(
                "Graphviz `dot` not available, wrote {} only",
                dot_path.display()
            );
            None
        }
    }
}
