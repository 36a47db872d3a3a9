use std::{collections::HashMap, fs, path::Path};

use regex::Regex;
use tracing::debug;

use crate::core::{BNError, BNResult, BayesNet, BayesNetBuilder};

/// Content of a node's interaction file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionSpec {
    /// Number of levels declared by `LEVELS=<n>`
    pub levels: Option<usize>,

    /// Parents declared by `ORDER=<p1> <p2> ...`
    pub order: Vec<String>,

    /// CPT rows declared by `<l1> <l2> ...: <v1>,<v2>,...`
    pub entries: Vec<(Vec<usize>, Vec<f64>)>,
}

impl InteractionSpec {
    /// Number of levels, either declared or implied by the CPT rows
    #[inline]
    pub fn cardinality(&self) -> Option<usize> {
        self.levels
            .or_else(|| self.entries.first().map(|(_, row)| row.len()))
    }
}

#[inline]
fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

#[inline]
fn pattern(re: &str) -> BNResult<Regex> {
    Regex::new(re).map_err(|err| BNError::Parse {
        line: 0,
        reason: err.to_string(),
    })
}

/// Parses an adjacency list, one `parent child` pair per line. Lines with
/// less than two names are skipped, `#` starts a comment
///
/// # Example
///
/// ```
/// use bnrs::io::parse_adjacency_list;
///
/// let edges = parse_adjacency_list("1 2\n# comment\n2 3\n");
/// assert_eq!(edges, vec![("1".to_string(), "2".to_string()), ("2".to_string(), "3".to_string())]);
/// ```
pub fn parse_adjacency_list(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let mut names = strip_comment(line).split_whitespace();
            match (names.next(), names.next()) {
                (Some(parent), Some(child)) => Some((parent.to_owned(), child.to_owned())),
                _ => None,
            }
        })
        .collect()
}

/// Parses an interaction file
///
/// # Example
///
/// ```
/// use bnrs::io::parse_interactions;
///
/// let spec = parse_interactions("LEVELS=2\nORDER=1\n0: 0.9,0.1\n1: 0.2,0.8\n").unwrap();
/// assert_eq!(spec.levels, Some(2));
/// assert_eq!(spec.order, vec!["1".to_string()]);
/// assert_eq!(spec.entries[1], (vec![1], vec![0.2, 0.8]));
/// ```
pub fn parse_interactions(text: &str) -> BNResult<InteractionSpec> {
    let levels_re = pattern(r"^LEVELS\s*=\s*(\d+)$")?;
    let order_re = pattern(r"^ORDER\s*=(.*)$")?;
    let entry_re = pattern(r"^([\d\s]*):(.*)$")?;
    let mut spec = InteractionSpec::default();
    for (index, line) in text.lines().enumerate() {
        let line = strip_comment(line);
        let parse_error = |reason: String| BNError::Parse {
            line: index + 1,
            reason,
        };
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = levels_re.captures(line) {
            let levels = caps[1]
                .parse()
                .map_err(|err| parse_error(format!("bad number of levels: {err}")))?;
            spec.levels = Some(levels);
        } else if let Some(caps) = order_re.captures(line) {
            spec.order = caps[1].split_whitespace().map(str::to_owned).collect();
        } else if let Some(caps) = entry_re.captures(line) {
            let combination = caps[1]
                .split_whitespace()
                .map(|x| x.parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| parse_error(format!("bad combination: {err}")))?;
            let row = caps[2]
                .split(',')
                .map(str::trim)
                .filter(|x| !x.is_empty())
                .map(|x| x.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| parse_error(format!("bad probability: {err}")))?;
            spec.entries.push((combination, row));
        } else {
            return Err(parse_error(format!("unrecognized line '{line}'")));
        }
    }
    Ok(spec)
}

/// Builds a network from an adjacency list and interaction files given as text.
/// Every node needs a number of levels, declared or implied by its CPT. Every
/// edge of the adjacency list must be covered by the `ORDER` of its child
///
/// # Arguments
///
/// * `adjacency` - An adjacency list (see [`parse_adjacency_list`])
/// * `interactions` - (node name, interaction file content) pairs
///
/// # Example
///
/// ```
/// use bnrs::io::network_from_texts;
///
/// let net = network_from_texts(
///     "1 2\n",
///     &[("1", "LEVELS=2\n: 0.5,0.5\n"), ("2", "LEVELS=2\nORDER=1\n0: 0.9,0.1\n1: 0.2,0.8\n")],
/// ).unwrap();
/// assert_eq!(net.edges().len(), 1);
/// ```
pub fn network_from_texts(adjacency: &str, interactions: &[(&str, &str)]) -> BNResult<BayesNet> {
    let edges = parse_adjacency_list(adjacency);
    let specs = interactions
        .iter()
        .map(|(name, text)| Ok((*name, parse_interactions(text)?)))
        .collect::<BNResult<Vec<_>>>()?;
    let spec_by_name: HashMap<&str, &InteractionSpec> =
        specs.iter().map(|(name, spec)| (*name, spec)).collect();
    let mut names: Vec<&str> = Vec::new();
    let mentioned = edges
        .iter()
        .flat_map(|(parent, child)| [parent.as_str(), child.as_str()])
        .chain(specs.iter().map(|(name, _)| *name))
        .chain(specs.iter().flat_map(|(_, spec)| spec.order.iter().map(String::as_str)));
    for name in mentioned {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    let mut bnb = BayesNetBuilder::new();
    for name in &names {
        let cardinality = spec_by_name
            .get(name)
            .and_then(|spec| spec.cardinality())
            .ok_or_else(|| BNError::MissingCardinality((*name).to_owned()))?;
        bnb.add_node(*name, cardinality)?;
    }
    for (name, spec) in &specs {
        if !spec.entries.is_empty() {
            let parents: Vec<&str> = spec.order.iter().map(String::as_str).collect();
            bnb.add_cpt(name, &parents, spec.entries.iter().cloned())?;
        } else if !spec.order.is_empty() {
            return Err(BNError::MissingCpt((*name).to_owned()));
        }
    }
    for (parent, child) in &edges {
        let covered = spec_by_name
            .get(child.as_str())
            .map_or(false, |spec| spec.order.contains(parent));
        if !covered {
            return Err(BNError::UncoveredEdge {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
    }
    debug!(nodes = names.len(), edges = edges.len(), "network read from text");
    Ok(bnb.build())
}

/// Reads a network from a folder containing `graph.txt`, an adjacency list, and
/// `interactions/<node name>.txt`, one interaction file per node
pub fn load_manual_spec(dir: impl AsRef<Path>) -> BNResult<BayesNet> {
    let dir = dir.as_ref();
    let adjacency = fs::read_to_string(dir.join("graph.txt"))?;
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.join("interactions"))? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "txt") {
            if let Some(stem) = path.file_stem().and_then(|x| x.to_str()) {
                files.push((stem.to_owned(), fs::read_to_string(&path)?));
            }
        }
    }
    files.sort();
    let interactions: Vec<(&str, &str)> = files
        .iter()
        .map(|(name, text)| (name.as_str(), text.as_str()))
        .collect();
    network_from_texts(&adjacency, &interactions)
}
