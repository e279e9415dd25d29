//! Declarative filter graph.
//!
//! A `FilterGraph` is a plain value: inputs, filter nodes wired by pads, and
//! named sinks. It renders to one `ffmpeg -filter_complex` invocation and can
//! be inspected directly by fake toolchains in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::ToolchainError;

/// A connection point in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pad {
    /// A raw stream of an input, e.g. `0:v:0` or `0:3`.
    Stream { input: usize, selector: String },
    /// An intermediate pad produced by a filter node.
    Label(String),
}

impl Pad {
    /// References stream `selector` of input `input`.
    pub fn stream(input: usize, selector: impl Into<String>) -> Self {
        Self::Stream {
            input,
            selector: selector.into(),
        }
    }

    /// Rendered as a filter pad (`[0:v:0]`, `[p3]`).
    fn as_filter_pad(&self) -> String {
        match self {
            Self::Stream { input, selector } => format!("[{}:{}]", input, selector),
            Self::Label(label) => format!("[{}]", label),
        }
    }

    /// Rendered as a `-map` argument (`0:3`, `[p3]`).
    fn as_map_arg(&self) -> String {
        match self {
            Self::Stream { input, selector } => format!("{}:{}", input, selector),
            Self::Label(label) => format!("[{}]", label),
        }
    }
}

/// A source file plus the options that precede its `-i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInput {
    path: PathBuf,
    options: Vec<(String, String)>,
}

impl GraphInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: Vec::new(),
        }
    }

    /// Adds an input option, e.g. `("ss", "1500ms")`.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }
}

/// One filter instance with its wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNode {
    pub name: String,
    pub args: String,
    pub inputs: Vec<Pad>,
    pub outputs: Vec<Pad>,
}

impl FilterNode {
    fn render(&self) -> String {
        let mut out = String::new();
        for pad in &self.inputs {
            out.push_str(&pad.as_filter_pad());
        }
        out.push_str(&self.name);
        if !self.args.is_empty() {
            out.push('=');
            out.push_str(&self.args);
        }
        for pad in &self.outputs {
            out.push_str(&pad.as_filter_pad());
        }
        out
    }
}

/// A named sink: the pad it consumes, its output options and its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOutput {
    source: Pad,
    path: PathBuf,
    options: Vec<(String, String)>,
}

impl GraphOutput {
    pub fn new(source: Pad, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
            options: Vec::new(),
        }
    }

    /// Adds an output option. An empty value renders as a bare flag (`-an`).
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn source(&self) -> &Pad {
        &self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    /// Value of option `key`, if set.
    pub fn option_value(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Inputs, filter nodes and sinks of one transcode job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGraph {
    inputs: Vec<GraphInput>,
    nodes: Vec<FilterNode>,
    outputs: Vec<GraphOutput>,
    next_label: usize,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input and returns its index.
    pub fn add_input(&mut self, input: GraphInput) -> usize {
        self.inputs.push(input);
        self.inputs.len() - 1
    }

    /// Adds a filter consuming `inputs` and producing `outputs` fresh pads.
    pub fn add_filter(
        &mut self,
        name: &str,
        args: impl Into<String>,
        inputs: Vec<Pad>,
        outputs: usize,
    ) -> Vec<Pad> {
        let produced: Vec<Pad> = (0..outputs).map(|_| self.fresh_label()).collect();
        self.nodes.push(FilterNode {
            name: name.to_string(),
            args: args.into(),
            inputs,
            outputs: produced.clone(),
        });
        produced
    }

    /// Single-input, single-output filter.
    pub fn filter(&mut self, name: &str, args: impl Into<String>, input: Pad) -> Pad {
        let mut pads = self.add_filter(name, args, vec![input], 1);
        pads.remove(0)
    }

    /// Multi-input, single-output filter such as `paletteuse`.
    pub fn combine(&mut self, name: &str, args: impl Into<String>, inputs: Vec<Pad>) -> Pad {
        let mut pads = self.add_filter(name, args, inputs, 1);
        pads.remove(0)
    }

    /// Fans `input` out into `count` identical pads.
    pub fn split(&mut self, input: Pad, count: usize) -> Vec<Pad> {
        self.add_filter("split", count.to_string(), vec![input], count)
    }

    /// Two-way [`split`](Self::split).
    pub fn fork(&mut self, input: Pad) -> (Pad, Pad) {
        let first = self.fresh_label();
        let second = self.fresh_label();
        self.nodes.push(FilterNode {
            name: "split".to_string(),
            args: "2".to_string(),
            inputs: vec![input],
            outputs: vec![first.clone(), second.clone()],
        });
        (first, second)
    }

    /// Adds a sink.
    pub fn add_output(&mut self, output: GraphOutput) {
        self.outputs.push(output);
    }

    pub fn inputs(&self) -> &[GraphInput] {
        &self.inputs
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[GraphOutput] {
        &self.outputs
    }

    fn fresh_label(&mut self) -> Pad {
        let label = format!("p{}", self.next_label);
        self.next_label += 1;
        Pad::Label(label)
    }

    /// Checks that the graph can be run: at least one sink, every stream pad
    /// references an existing input, every labelled pad is consumed exactly
    /// once.
    pub fn validate(&self) -> Result<(), ToolchainError> {
        if self.outputs.is_empty() {
            return Err(ToolchainError::invalid_graph("graph has no outputs"));
        }

        let mut consumers: HashMap<&str, usize> = HashMap::new();
        let consumed = self
            .nodes
            .iter()
            .flat_map(|n| n.inputs.iter())
            .chain(self.outputs.iter().map(|o| &o.source));

        for pad in consumed {
            match pad {
                Pad::Stream { input, .. } => {
                    if *input >= self.inputs.len() {
                        return Err(ToolchainError::invalid_graph(format!(
                            "pad references missing input {}",
                            input
                        )));
                    }
                }
                Pad::Label(label) => *consumers.entry(label.as_str()).or_default() += 1,
            }
        }

        for pad in self.nodes.iter().flat_map(|n| n.outputs.iter()) {
            if let Pad::Label(label) = pad {
                match consumers.get(label.as_str()) {
                    Some(1) => {}
                    Some(n) => {
                        return Err(ToolchainError::invalid_graph(format!(
                            "pad [{}] consumed {} times",
                            label, n
                        )))
                    }
                    None => {
                        return Err(ToolchainError::invalid_graph(format!(
                            "pad [{}] is never consumed",
                            label
                        )))
                    }
                }
            }
        }

        Ok(())
    }

    /// The `-filter_complex` description, or `None` for a graph without filters.
    pub fn filter_complex(&self) -> Option<String> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(
            self.nodes
                .iter()
                .map(FilterNode::render)
                .collect::<Vec<_>>()
                .join(";"),
        )
    }

    /// Renders inputs, the filter description and every sink as ffmpeg
    /// arguments. Global flags are left to the caller.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for input in &self.inputs {
            push_options(&mut args, &input.options);
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        if let Some(description) = self.filter_complex() {
            args.push("-filter_complex".to_string());
            args.push(description);
        }

        for output in &self.outputs {
            args.push("-map".to_string());
            args.push(output.source.as_map_arg());
            push_options(&mut args, &output.options);
            args.push(output.path.to_string_lossy().to_string());
        }

        args
    }
}

fn push_options(args: &mut Vec<String>, options: &[(String, String)]) {
    for (key, value) in options {
        args.push(format!("-{}", key));
        if !value.is_empty() {
            args.push(value.clone());
        }
    }
}

/// Escapes a filter option value for both the option parser and the graph
/// parser, so paths and style strings may contain `:` `,` `'` and brackets.
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy_and_thumbs() -> FilterGraph {
        let mut graph = FilterGraph::new();
        let source = graph.add_input(GraphInput::new("/in/S01E02.mkv"));
        let scaled = graph.filter("scale", "640:-1", Pad::stream(source, "0"));
        let branches = graph.split(scaled, 2);
        let thumbs = graph.filter("fps", "5", branches[1].clone());
        graph.add_output(
            GraphOutput::new(branches[0].clone(), "/out/proxy.mkv")
                .option("an", "")
                .option("c:v", "libx264"),
        );
        graph.add_output(GraphOutput::new(thumbs, "/out/_thumb_%08d.jpg"));
        graph.add_output(GraphOutput::new(Pad::stream(source, "2"), "/out/subtitles.srt"));
        graph
    }

    #[test]
    fn test_filter_complex_rendering() {
        let graph = proxy_and_thumbs();
        assert_eq!(
            graph.filter_complex().unwrap(),
            "[0:0]scale=640:-1[p0];[p0]split=2[p1][p2];[p2]fps=5[p3]"
        );
    }

    #[test]
    fn test_fork_renders_like_split() {
        let mut graph = FilterGraph::new();
        let source = graph.add_input(GraphInput::new("/in/clip.mkv"));
        let (left, right) = graph.fork(Pad::stream(source, "v"));
        let palette = graph.filter("palettegen", "max_colors=64", left);
        graph.add_filter("paletteuse", "", vec![right, palette], 1);
        assert_eq!(
            graph.filter_complex().unwrap(),
            "[0:v]split=2[p0][p1];[p0]palettegen=max_colors=64[p2];[p1][p2]paletteuse[p3]"
        );
    }

    #[test]
    fn test_to_args_maps_every_sink() {
        let args = proxy_and_thumbs().to_args();
        let joined = args.join(" ");
        assert!(joined.starts_with("-i /in/S01E02.mkv -filter_complex"));
        assert!(joined.contains("-map [p1] -an -c:v libx264 /out/proxy.mkv"));
        assert!(joined.contains("-map [p3] /out/_thumb_%08d.jpg"));
        assert!(joined.ends_with("-map 0:2 /out/subtitles.srt"));
    }

    #[test]
    fn test_input_options_precede_input() {
        let mut graph = FilterGraph::new();
        let source = graph.add_input(
            GraphInput::new("/in.mkv")
                .option("ss", "100ms")
                .option("to", "900ms"),
        );
        graph.add_output(GraphOutput::new(Pad::stream(source, "v:0"), "/out.gif"));
        let args = graph.to_args();
        assert_eq!(
            args,
            vec!["-ss", "100ms", "-to", "900ms", "-i", "/in.mkv", "-map", "0:v:0", "/out.gif"]
        );
        assert!(graph.filter_complex().is_none());
    }

    #[test]
    fn test_validate_accepts_well_formed_graph() {
        assert!(proxy_and_thumbs().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_pad() {
        let mut graph = FilterGraph::new();
        let source = graph.add_input(GraphInput::new("/in.mkv"));
        let branches = graph.split(Pad::stream(source, "v:0"), 2);
        graph.add_output(GraphOutput::new(branches[0].clone(), "/a.gif"));
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("never consumed"));
    }

    #[test]
    fn test_validate_rejects_double_consumption() {
        let mut graph = FilterGraph::new();
        let source = graph.add_input(GraphInput::new("/in.mkv"));
        let pad = graph.filter("fps", "12", Pad::stream(source, "v:0"));
        graph.add_output(GraphOutput::new(pad.clone(), "/a.gif"));
        graph.add_output(GraphOutput::new(pad, "/b.gif"));
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_input_and_empty_graph() {
        assert!(FilterGraph::new().validate().is_err());

        let mut graph = FilterGraph::new();
        graph.add_output(GraphOutput::new(Pad::stream(3, "v:0"), "/a.gif"));
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_option_value_lookup() {
        let output = GraphOutput::new(Pad::Label("p0".into()), "/x_%08d.jpg")
            .option("start_number", "0");
        assert_eq!(output.option_value("start_number"), Some("0"));
        assert_eq!(output.option_value("q:v"), None);
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("/tmp/subs.srt"), "/tmp/subs.srt");
        assert_eq!(
            escape_filter_value("FontSize=24,Alignment=2"),
            r"FontSize=24\,Alignment=2"
        );
        assert_eq!(escape_filter_value("a,b:c"), r"a\,b\\:c");
        assert_eq!(escape_filter_value("it's"), r"it\\\'s");
    }
}
