use crate::ir::{FlowGraph, LinkSpec, NodeRef, NodeSpec};
use anyhow::{Result, anyhow, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tracing::{debug, warn};

static INIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%\{\s*init\s*:\s*(\{.*\})\s*\}%%").unwrap());
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^sankey(-beta)?\s*$").unwrap());
static COLUMNS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^columns\s*:\s*(.*)$").unwrap());

const LABEL_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `{columns, nodes, links}` document.
    Json,
    /// `source,target,value` lines.
    Flows,
    /// CSV table of categorical records, one stage per column.
    Records,
}

#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Column whose numbers weight each row. Rows count as 1 without it.
    pub value_column: Option<String>,
    /// Rows weighted below this are dropped.
    pub threshold: Option<f64>,
    /// Column names for tables without a header row.
    pub header: Option<Vec<String>>,
    /// Columns chained as stages, in order. Defaults to every column that
    /// is neither the value column nor filtered on.
    pub stages: Option<Vec<String>>,
    /// `(column, value)` pairs a row must all match to be kept.
    pub filters: Vec<(String, String)>,
    pub separator: char,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            value_column: None,
            threshold: None,
            header: None,
            stages: None,
            filters: Vec::new(),
            separator: '-',
        }
    }
}

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub graph: FlowGraph,
    pub init_config: Option<serde_json::Value>,
}

pub fn detect_format(path: Option<&Path>, input: &str) -> InputFormat {
    let ext = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json" | "json5") => return InputFormat::Json,
        Some("csv" | "data") => return InputFormat::Records,
        _ => {}
    }
    if input.trim_start().starts_with('{') {
        InputFormat::Json
    } else {
        InputFormat::Flows
    }
}

pub fn parse_input(input: &str, format: InputFormat, records: &RecordOptions) -> Result<ParseOutput> {
    match format {
        InputFormat::Json => parse_json_graph(input),
        InputFormat::Flows => parse_flow_list(input),
        InputFormat::Records => parse_records(input, records),
    }
}

pub fn parse_json_graph(input: &str) -> Result<ParseOutput> {
    let graph: FlowGraph = match serde_json::from_str(input) {
        Ok(graph) => graph,
        Err(json_err) => json5::from_str(input)
            .map_err(|_| anyhow!("invalid graph document: {json_err}"))?,
    };
    debug!(nodes = graph.nodes.len(), links = graph.links.len(), "parsed graph document");
    Ok(ParseOutput {
        graph,
        init_config: None,
    })
}

pub fn parse_flow_list(input: &str) -> Result<ParseOutput> {
    let mut graph = FlowGraph::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let (lines, init_config) = preprocess_input(input)?;

    for (line_no, line) in lines.iter().enumerate() {
        if HEADER_RE.is_match(line) {
            continue;
        }
        if let Some(caps) = COLUMNS_RE.captures(line) {
            graph.columns = split_fields(&caps[1])
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect();
            continue;
        }
        let parts = split_fields(line);
        if parts.len() < 3 || parts[0].is_empty() || parts[1].is_empty() {
            warn!(line = line_no + 1, "skipping malformed flow line");
            continue;
        }
        let Ok(value) = parts[2].parse::<f64>() else {
            warn!(line = line_no + 1, value = %parts[2], "skipping flow with non-numeric value");
            continue;
        };
        let source = intern(&mut graph, &mut index, &parts[0], None, None);
        let target = intern(&mut graph, &mut index, &parts[1], None, None);
        graph.links.push(LinkSpec::new(source, target, value));
    }

    Ok(ParseOutput { graph, init_config })
}

pub fn parse_records(input: &str, options: &RecordOptions) -> Result<ParseOutput> {
    let mut reader = ReaderBuilder::new()
        .has_headers(options.header.is_none())
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());
    let header = match &options.header {
        Some(header) => StringRecord::from(header.clone()),
        None => reader.headers()?.clone(),
    };
    if header.is_empty() {
        bail!("record table is empty");
    }
    let rows = reader.records().collect::<Result<Vec<StringRecord>, _>>()?;
    let graph = flows_from_records(&header, &rows, options)?;
    Ok(ParseOutput {
        graph,
        init_config: None,
    })
}

/// Builds a staged flow graph from categorical rows. Adjacent stage values
/// of each row become a link between `<column><sep><value>` nodes; repeated
/// pairs accumulate. Rows failing any equality filter are dropped first.
pub fn flows_from_records(
    header: &StringRecord,
    rows: &[StringRecord],
    options: &RecordOptions,
) -> Result<FlowGraph> {
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("column {name:?} not found in header"))
    };
    let value_idx = match &options.value_column {
        Some(name) => Some(column(name.as_str())?),
        None => None,
    };
    let mut filters: Vec<(usize, &str)> = Vec::with_capacity(options.filters.len());
    for (name, expected) in &options.filters {
        filters.push((column(name.as_str())?, expected.as_str()));
    }
    let stages: Vec<usize> = match &options.stages {
        Some(names) => names.iter().map(|name| column(name.as_str())).collect::<Result<_>>()?,
        None => (0..header.len())
            .filter(|idx| Some(*idx) != value_idx && filters.iter().all(|(f, _)| f != idx))
            .collect(),
    };
    if stages.len() < 2 {
        bail!("record table needs at least two stage columns");
    }

    let mut graph = FlowGraph::new();
    graph.columns = stages.iter().map(|&idx| header[idx].to_string()).collect();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut link_index: HashMap<(usize, usize), usize> = HashMap::new();
    let mut filtered = 0usize;
    let mut skipped = 0usize;

    for row in rows {
        if !filters.iter().all(|&(idx, expected)| row.get(idx) == Some(expected)) {
            filtered += 1;
            continue;
        }
        let weight = match value_idx {
            Some(idx) => match row.get(idx).and_then(|v| v.parse::<f64>().ok()) {
                Some(weight) => weight,
                None => {
                    skipped += 1;
                    continue;
                }
            },
            None => 1.0,
        };
        if options.threshold.is_some_and(|threshold| weight < threshold) {
            skipped += 1;
            continue;
        }

        for pair in stages.windows(2) {
            let (from_col, to_col) = (pair[0], pair[1]);
            let from_value = row.get(from_col).unwrap_or("");
            let to_value = row.get(to_col).unwrap_or("");
            if from_value.is_empty() || to_value.is_empty() {
                break;
            }
            let source = stage_node(&mut graph, &mut index, &header[from_col], from_value, options);
            let target = stage_node(&mut graph, &mut index, &header[to_col], to_value, options);
            match link_index.get(&(source, target)) {
                Some(&link) => graph.links[link].value += weight,
                None => {
                    link_index.insert((source, target), graph.links.len());
                    graph.links.push(LinkSpec::new(source, target, weight));
                }
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "dropped records below threshold or without a usable value");
    }
    debug!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        filtered,
        "built flows from records"
    );
    Ok(graph)
}

fn stage_node(
    graph: &mut FlowGraph,
    index: &mut HashMap<String, usize>,
    column: &str,
    value: &str,
    options: &RecordOptions,
) -> usize {
    let name = format!("{column}{}{value}", options.separator);
    let label: String = value.chars().take(LABEL_LIMIT).collect();
    intern(graph, index, &name, Some(column), Some(&label))
}

fn intern(
    graph: &mut FlowGraph,
    index: &mut HashMap<String, usize>,
    name: &str,
    category: Option<&str>,
    label: Option<&str>,
) -> usize {
    if let Some(&idx) = index.get(name) {
        return idx;
    }
    let idx = graph.nodes.len();
    graph.nodes.push(NodeSpec {
        name: name.to_string(),
        category: category.map(str::to_string),
        label: label.map(str::to_string),
    });
    index.insert(name.to_string(), idx);
    idx
}

/// Places every node in the column of its longest path from a source and
/// names the columns `stage0`, `stage1`, ... Fails on cycles.
pub fn infer_columns(graph: &mut FlowGraph) -> Result<()> {
    let node_count = graph.nodes.len();
    let by_name = graph.name_index();
    let resolve = |node: &NodeRef| match node {
        NodeRef::Index(idx) => (*idx < node_count).then_some(*idx),
        NodeRef::Name(name) => by_name.get(name.as_str()).copied(),
    };

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indegree = vec![0usize; node_count];
    for link in &graph.links {
        let (Some(from), Some(to)) = (resolve(&link.source), resolve(&link.target)) else {
            continue;
        };
        outgoing[from].push(to);
        indegree[to] += 1;
    }

    let mut ranks = vec![0usize; node_count];
    let mut queue: VecDeque<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(idx, deg)| (*deg == 0).then_some(idx))
        .collect();
    let mut visited = 0usize;
    while let Some(node) = queue.pop_front() {
        visited += 1;
        for &to in &outgoing[node] {
            ranks[to] = ranks[to].max(ranks[node] + 1);
            indegree[to] -= 1;
            if indegree[to] == 0 {
                queue.push_back(to);
            }
        }
    }
    if visited < node_count {
        bail!("flows contain a cycle; add a `columns:` line to place nodes explicitly");
    }

    let max_rank = ranks.iter().copied().max().unwrap_or(0);
    graph.columns = (0..=max_rank).map(|rank| format!("stage{rank}")).collect();
    for (node, rank) in graph.nodes.iter_mut().zip(ranks) {
        node.category = Some(format!("stage{rank}"));
    }
    Ok(())
}

fn preprocess_input(input: &str) -> Result<(Vec<String>, Option<serde_json::Value>)> {
    let mut init_config: Option<serde_json::Value> = None;
    let mut lines = Vec::new();

    for raw_line in input.lines() {
        let trimmed_line = raw_line.trim();
        if trimmed_line.is_empty() {
            continue;
        }
        if let Some(caps) = INIT_RE.captures(trimmed_line) {
            if let Some(json_str) = caps.get(1).map(|m| m.as_str()) {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                    init_config = Some(value);
                } else if let Ok(value) = json5::from_str::<serde_json::Value>(json_str) {
                    init_config = Some(value);
                } else {
                    warn!("ignoring unparsable init directive");
                }
            }
            continue;
        }
        if trimmed_line.starts_with("%%") {
            continue;
        }
        let without_comment = strip_trailing_comment(trimmed_line);
        if without_comment.is_empty() {
            continue;
        }
        lines.push(without_comment);
    }

    Ok((lines, init_config))
}

fn strip_trailing_comment(line: &str) -> String {
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();
    let mut out = String::new();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            quote = Some(ch);
            out.push(ch);
            continue;
        }
        if ch == '%'
            && let Some('%') = chars.peek().copied()
        {
            break;
        }
        out.push(ch);
    }
    out.trim().to_string()
}

/// Splits a flow-list line. Fields are trimmed, double quotes group
/// commas and `""` inside quotes is a literal quote. Empty fields are kept.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if quoted {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '"' => quoted = true,
            ',' => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
