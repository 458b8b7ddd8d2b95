//! Display metadata for backend tool identifiers.

/// Icon shown next to a running tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolIcon {
    Search,
    Download,
    Analyze,
    Write,
    Document,
    Generic,
}

impl ToolIcon {
    /// Terminal glyph for the icon.
    pub fn glyph(&self) -> &'static str {
        match self {
            ToolIcon::Search => "🔍",
            ToolIcon::Download => "📥",
            ToolIcon::Analyze => "📊",
            ToolIcon::Write => "✍",
            ToolIcon::Document => "📄",
            ToolIcon::Generic => "⚙",
        }
    }
}

/// What the activity indicator shows while a tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDisplay {
    /// Raw identifier as sent by the backend.
    pub tool: String,
    pub name: String,
    pub status: String,
    pub icon: ToolIcon,
}

// (identifier, display name, status line, icon)
const KNOWN_TOOLS: &[(&str, &str, &str, ToolIcon)] = &[
    ("arxiv_search", "arXiv Search", "Searching arXiv for relevant papers...", ToolIcon::Search),
    ("pubmed_search", "PubMed Search", "Searching PubMed for biomedical literature...", ToolIcon::Search),
    ("semantic_scholar_search", "Semantic Scholar", "Querying Semantic Scholar...", ToolIcon::Search),
    ("google_scholar_search", "Google Scholar", "Searching Google Scholar...", ToolIcon::Search),
    ("web_search", "Web Search", "Searching the web...", ToolIcon::Search),
    ("search_all_databases", "Search All Databases", "Searching across all academic databases...", ToolIcon::Search),
    ("download_paper", "Download Paper", "Downloading paper...", ToolIcon::Download),
    ("read_paper", "Read Paper", "Reading paper contents...", ToolIcon::Document),
    ("analyze_paper", "Analyze Paper", "Analyzing paper contents...", ToolIcon::Analyze),
    ("identify_research_gaps", "Research Gaps", "Identifying research gaps and opportunities...", ToolIcon::Analyze),
    ("write_paper", "Write Paper", "Drafting research paper...", ToolIcon::Write),
    ("generate_pdf", "Generate PDF", "Generating publication-ready PDF...", ToolIcon::Document),
];

/// Look up how to present `tool`. Unknown identifiers get a generic
/// "Using <tool>..." entry.
pub fn describe_tool(tool: &str) -> ToolDisplay {
    match KNOWN_TOOLS.iter().find(|(id, ..)| *id == tool) {
        Some((_, name, status, icon)) => ToolDisplay {
            tool: tool.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            icon: *icon,
        },
        None => ToolDisplay {
            tool: tool.to_string(),
            name: tool.to_string(),
            status: format!("Using {tool}..."),
            icon: ToolIcon::Generic,
        },
    }
}
