//! A small intermediate representation of an ffmpeg filter graph.
//!
//! The builder produces a [`FilterGraph`] made of [`Fragment`]s; rendering
//! to the `-filter_complex` string is a separate step ([`FilterGraph::render`])
//! so the structure itself can be inspected and compared in tests.

use std::fmt;

/// Which elementary stream of an input file a pad refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(&self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }
}

/// A single filter argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `value`
    Positional(String),
    /// `key=value`
    Keyed(String, String),
    /// `key='expression'`; quoted so commas inside the expression do not
    /// split the filter chain.
    Expr(String, String),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Positional(v) => f.write_str(v),
            Arg::Keyed(k, v) => write!(f, "{k}={v}"),
            Arg::Expr(k, v) => write!(f, "{k}='{v}'"),
        }
    }
}

/// One filter with its arguments, e.g. `scale=1080:1920`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<Arg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn positional(mut self, value: impl ToString) -> Self {
        self.args.push(Arg::Positional(value.to_string()));
        self
    }

    pub fn keyed(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(Arg::Keyed(key.into(), value.to_string()));
        self
    }

    pub fn expr(mut self, key: impl Into<String>, expr: impl Into<String>) -> Self {
        self.args.push(Arg::Expr(key.into(), expr.into()));
        self
    }

    /// Value of a keyed or expression argument.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            Arg::Keyed(k, v) | Arg::Expr(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

/// Where a fragment reads a stream from.
#[derive(Debug, Clone, PartialEq)]
pub enum Pad {
    /// A stream of an encoder input, `[index:v]`.
    Input { index: usize, stream: StreamKind },
    /// The output of an earlier fragment.
    Label(String),
    /// A source filter emitted as its own chain right before the fragment
    /// that consumes it.
    Generated { source: Filter, label: String },
}

impl Pad {
    pub fn video_input(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamKind::Video,
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Pad::Label(label.into())
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Input { index, stream } => write!(f, "[{index}:{}]", stream.specifier()),
            Pad::Label(label) | Pad::Generated { label, .. } => write!(f, "[{label}]"),
        }
    }
}

/// The role a fragment plays in the composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Background scaling and animation.
    Background,
    /// Progress bar composited over the background.
    ProgressBar,
    /// Timed overlay of the layer with this index.
    Overlay { layer: usize },
    /// Final pixel format normalisation.
    Format,
}

/// One stage of the graph: `{inputs, filters, output}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub stage: Stage,
    pub inputs: Vec<Pad>,
    pub filters: Vec<Filter>,
    pub output: String,
}

impl Fragment {
    /// Render this fragment as one or more `;`-separated chains.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for pad in &self.inputs {
            if let Pad::Generated { source, label } = pad {
                out.push_str(&format!("{source}[{label}];"));
            }
        }
        for pad in &self.inputs {
            out.push_str(&pad.to_string());
        }
        let chain: Vec<String> = self.filters.iter().map(ToString::to_string).collect();
        out.push_str(&chain.join(","));
        out.push_str(&format!("[{}]", self.output));
        out
    }
}

/// An ordered list of fragments ending in a single labelled video pad.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGraph {
    fragments: Vec<Fragment>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Label of the last fragment's output.
    pub fn output_label(&self) -> Option<&str> {
        self.fragments.last().map(|f| f.output.as_str())
    }

    /// Number of fragments playing a role matched by `pred`.
    pub fn count_stages(&self, pred: impl Fn(&Stage) -> bool) -> usize {
        self.fragments.iter().filter(|f| pred(&f.stage)).count()
    }

    /// The `-filter_complex` expression.
    pub fn render(&self) -> String {
        self.fragments
            .iter()
            .map(Fragment::render)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
