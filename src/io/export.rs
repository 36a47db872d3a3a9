use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    io::Write,
};

use serde::{Deserialize, Serialize};

use crate::core::{BNResult, BayesNet, Node};

#[inline]
fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

#[inline]
fn combination_key(combination: &[usize]) -> String {
    let levels: Vec<String> = combination.iter().map(usize::to_string).collect();
    format!("({})", levels.join(", "))
}

#[inline]
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ------------------------------------------------------------------------------------------

/// Options of the Graphviz export
#[derive(Debug, Clone, PartialEq)]
pub struct DotOptions {
    /// Print CPT rows inside node labels
    pub show_cpt: bool,

    /// Extra attributes of every node, e.g. ("shape", "Msquare")
    pub node_attributes: Vec<(String, String)>,
}

impl Default for DotOptions {
    fn default() -> Self {
        DotOptions {
            show_cpt: true,
            node_attributes: Vec::new(),
        }
    }
}

fn dot_label(f: &mut Formatter<'_>, node: &Node, show_cpt: bool) -> fmt::Result {
    write!(
        f,
        "<<table border=\"0\" cellborder=\"0\" cellpadding=\"3\" bgcolor=\"white\">"
    )?;
    write!(
        f,
        "<tr><td bgcolor=\"black\" align=\"center\" colspan=\"2\"><font color=\"white\">Var Name {}</font></td></tr>",
        escape_html(node.name()),
    )?;
    if let (true, Some(cpt)) = (show_cpt, node.cpt()) {
        write!(f, "<tr><td align=\"left\" colspan=\"2\"><font color=\"black\">Interactions</font></td></tr>")?;
        for (combination, row) in cpt.entries() {
            write!(
                f,
                "<tr><td align=\"left\" port=\"r0\">{} &#58; {:?}</td></tr>",
                combination_key(&combination),
                row.to_vec(),
            )?;
        }
    }
    write!(f, "<tr><td align=\"left\" colspan=\"2\" bgcolor=\"grey\"><font color=\"black\">Beliefs</font></td></tr>")?;
    if let Some(belief) = node.belief() {
        for (level, p) in belief.iter().enumerate() {
            write!(
                f,
                "<tr><td align=\"left\" port=\"r0\"> {} &#58; {}</td></tr>",
                level,
                round4(*p),
            )?;
        }
    }
    write!(f, "</table>>")
}

#[inline]
fn quoted(name: &str) -> String {
    name.replace('"', "\\\"")
}

/// A network in the Graphviz dot language. Every node is drawn
/// as a table with its name, optionally its CPT, and its beliefs
#[derive(Debug, Clone, Copy)]
pub struct Dot<'a> {
    net: &'a BayesNet,
    options: &'a DotOptions,
}

impl<'a> Dot<'a> {
    #[inline]
    pub fn new(net: &'a BayesNet, options: &'a DotOptions) -> Self {
        Dot { net, options }
    }
}

impl Display for Dot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph Bayes_Net {{")?;
        for node in self.net.nodes() {
            write!(f, "\"{}\" [label=", quoted(node.name()))?;
            dot_label(f, node, self.options.show_cpt)?;
            for (key, value) in &self.options.node_attributes {
                write!(f, ", {}=\"{}\"", key, quoted(value))?;
            }
            writeln!(f, "];")?;
        }
        let nodes = self.net.nodes();
        for edge in self.net.edges() {
            writeln!(
                f,
                "\"{}\" -> \"{}\";",
                quoted(nodes[edge.parent.0].name()),
                quoted(nodes[edge.child.0].name()),
            )?;
        }
        write!(f, "}}")
    }
}

/// Renders a network in the Graphviz dot language (see [`Dot`])
///
/// # Example
///
/// ```
/// use bnrs::core::BayesNetBuilder;
/// use bnrs::io::{to_dot, DotOptions};
///
/// let mut bnb = BayesNetBuilder::new();
/// bnb.add_node("rain", 2).unwrap();
/// bnb.add_node("wet", 2).unwrap();
/// bnb.add_cpt("wet", &["rain"], vec![
///     (vec![0], vec![0.9, 0.1]),
///     (vec![1], vec![0.2, 0.8]),
/// ]).unwrap();
/// let dot = to_dot(&bnb.build(), &DotOptions::default());
/// assert!(dot.starts_with("digraph Bayes_Net {"));
/// assert!(dot.contains("\"rain\" -> \"wet\";"));
/// ```
#[inline]
pub fn to_dot(net: &BayesNet, options: &DotOptions) -> String {
    Dot::new(net, options).to_string()
}

/// Writes a network in the Graphviz dot language (see [`to_dot`])
pub fn write_dot(net: &BayesNet, options: &DotOptions, mut writer: impl Write) -> BNResult<()> {
    write!(writer, "{}", Dot::new(net, options))?;
    Ok(())
}

// ------------------------------------------------------------------------------------------

/// A node of the JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub name: String,

    /// Beliefs per level rounded to four digits, empty until beliefs are computed
    pub beliefs: BTreeMap<usize, f64>,

    /// CPT rows keyed by the combination of parents' levels, e.g. "(0, 1)"
    pub cpt: BTreeMap<String, Vec<f64>>,
}

/// An edge of the JSON document, as indices into the nodes list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDocument {
    pub source: usize,
    pub target: usize,
}

/// JSON representation of a network in the node-link layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub nodes: Vec<NodeDocument>,
    pub links: Vec<LinkDocument>,
}

impl From<&BayesNet> for NetworkDocument {
    fn from(net: &BayesNet) -> Self {
        let nodes = net
            .nodes()
            .iter()
            .map(|node| NodeDocument {
                name: node.name().to_owned(),
                beliefs: node
                    .belief()
                    .map(|belief| belief.iter().map(|p| round4(*p)).enumerate().collect())
                    .unwrap_or_default(),
                cpt: node
                    .cpt()
                    .map(|cpt| {
                        cpt.entries()
                            .map(|(combination, row)| (combination_key(&combination), row.to_vec()))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();
        let links = net
            .edges()
            .iter()
            .map(|edge| LinkDocument {
                source: edge.parent.0,
                target: edge.child.0,
            })
            .collect();
        NetworkDocument { nodes, links }
    }
}

/// Serializes a network with its beliefs and CPTs to JSON
pub fn to_json(net: &BayesNet) -> BNResult<String> {
    Ok(serde_json::to_string_pretty(&NetworkDocument::from(net))?)
}

/// Writes a network with its beliefs and CPTs as JSON
pub fn write_json(net: &BayesNet, writer: impl Write) -> BNResult<()> {
    serde_json::to_writer_pretty(writer, &NetworkDocument::from(net))?;
    Ok(())
}

// ------------------------------------------------------------------------------------------

/// Human readable summary of a network's beliefs
///
/// # Example
///
/// ```
/// use bnrs::core::BayesNetBuilder;
/// use bnrs::io::Summary;
///
/// let mut bnb = BayesNetBuilder::new();
/// bnb.add_node("rain", 2).unwrap();
/// let net = bnb.build();
/// let text = Summary::new(&net).to_string();
/// assert!(text.starts_with("Node: rain"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a> {
    net: &'a BayesNet,
    show_cpt: bool,
}

impl<'a> Summary<'a> {
    #[inline]
    pub fn new(net: &'a BayesNet) -> Self {
        Summary {
            net,
            show_cpt: false,
        }
    }

    /// Also list CPT rows of every node
    #[inline]
    pub fn with_cpt(mut self, show_cpt: bool) -> Self {
        self.show_cpt = show_cpt;
        self
    }
}

impl Display for Summary<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let nodes = self.net.nodes();
        for node in nodes {
            writeln!(f, "Node: {}", node.name())?;
            writeln!(f, "{}", "-_".repeat(10))?;
            if let (true, Some(cpt)) = (self.show_cpt, node.cpt()) {
                let order: Vec<&str> = node.parents().iter().map(|p| nodes[p.0].name()).collect();
                writeln!(f, "Node Interactions: ")?;
                writeln!(f, "Order: {:?}", order)?;
                for (combination, row) in cpt.entries() {
                    writeln!(f, "{}\t{:?}", combination_key(&combination), row.to_vec())?;
                }
                writeln!(f, "{}", "-".repeat(20))?;
            }
            writeln!(f, "Node Beliefs: ")?;
            if let Some(belief) = node.belief() {
                for (level, p) in belief.iter().enumerate() {
                    writeln!(f, "{}:\t{:.3}", level, p)?;
                }
            }
            writeln!(f, "{}", "_-".repeat(10))?;
            writeln!(f)?;
        }
        Ok(())
    }
}
