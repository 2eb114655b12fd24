use unicode_segmentation::UnicodeSegmentation;

pub const EMPTY_NOTE_SUMMARY: &str = "Empty note: nothing to summarize.";

const PRIORITY_PREFIX: &str = "Priority summary: ";
const MEETING_PREFIX: &str = "Meeting summary: ";
const GENERAL_PREFIX: &str = "General note: ";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRules {
	pub max_chars: usize,
	pub priority_keywords: Vec<String>,
	pub meeting_keywords: Vec<String>,
}
impl Default for SummaryRules {
	fn default() -> Self {
		Self::from(&summa_config::Summary::default())
	}
}
impl From<&summa_config::Summary> for SummaryRules {
	fn from(cfg: &summa_config::Summary) -> Self {
		Self {
			max_chars: cfg.max_chars as usize,
			priority_keywords: cfg.priority_keywords.clone(),
			meeting_keywords: cfg.meeting_keywords.clone(),
		}
	}
}

/// Derives a summary from note text.
///
/// Pure and total: the same text and rules always give the same non-empty output.
pub fn summarize(raw_text: &str, rules: &SummaryRules) -> String {
	let collapsed = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");

	if collapsed.is_empty() {
		return EMPTY_NOTE_SUMMARY.to_string();
	}

	let lowered = collapsed.to_lowercase();
	let prefix = if contains_any(&lowered, &rules.priority_keywords) {
		PRIORITY_PREFIX
	} else if contains_any(&lowered, &rules.meeting_keywords) {
		MEETING_PREFIX
	} else {
		GENERAL_PREFIX
	};

	format!("{prefix}{}", leading_excerpt(&collapsed, rules.max_chars))
}

fn contains_any(lowered: &str, keywords: &[String]) -> bool {
	keywords
		.iter()
		.map(|keyword| keyword.trim().to_lowercase())
		.any(|keyword| !keyword.is_empty() && lowered.contains(&keyword))
}

fn leading_excerpt(text: &str, max_chars: usize) -> String {
	let max_chars = max_chars.max(1);
	let mut graphemes = text.graphemes(true);
	let mut out: String = graphemes.by_ref().take(max_chars).collect();

	if graphemes.next().is_some() {
		out.truncate(out.trim_end().len());
		out.push_str(ELLIPSIS);
	}

	out
}
