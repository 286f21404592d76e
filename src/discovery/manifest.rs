//! SKILL.md text extraction
//!
//! Front-matter is a line-oriented `key: value` block between `---` lines, not
//! YAML. Indented lines continue the previous key. Trigger keywords come from
//! the description and from a `## 트리거` / `## Triggers` bullet section.

use crate::models::{TriggerInfo, TriggerSource};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

static FRONT_MATTER_KEY: OnceLock<Regex> = OnceLock::new();
static KO_TRIGGERS: OnceLock<Regex> = OnceLock::new();
static EN_TRIGGERS: OnceLock<Regex> = OnceLock::new();
static QUOTED: OnceLock<Regex> = OnceLock::new();
static TRIGGER_SECTION: OnceLock<Regex> = OnceLock::new();
static CODE_BLOCK: OnceLock<Regex> = OnceLock::new();

fn front_matter_key() -> &'static Regex {
    FRONT_MATTER_KEY.get_or_init(|| Regex::new(r"^(\w[\w\s]*?):\s*(.+)$").expect("valid regex"))
}

fn ko_triggers() -> &'static Regex {
    KO_TRIGGERS.get_or_init(|| Regex::new(r"트리거[:\s]+(.+?)(?:\.|$)").expect("valid regex"))
}

fn en_triggers() -> &'static Regex {
    EN_TRIGGERS
        .get_or_init(|| Regex::new(r"[Tt]riggers?\s+on\s+(.+?)(?:\.|$)").expect("valid regex"))
}

fn quoted() -> &'static Regex {
    QUOTED.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("valid regex"))
}

fn trigger_section() -> &'static Regex {
    TRIGGER_SECTION.get_or_init(|| {
        Regex::new(r"(?m)##[ \t]*(?:트리거|[Tt]riggers?)[ \t]*\n((?:[-*][ \t]*.+\n?)+)")
            .expect("valid regex")
    })
}

fn code_block() -> &'static Regex {
    CODE_BLOCK.get_or_init(|| Regex::new(r"(?s)```(\w*)\n(.*?)```").expect("valid regex"))
}

/// Front-matter fields plus the body that follows
#[derive(Debug, Default, PartialEq)]
pub struct Manifest<'a> {
    pub fields: BTreeMap<String, String>,
    pub body: &'a str,
}

fn strip_quotes(value: &str) -> String {
    value
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

/// Split SKILL.md text into front-matter fields and body.
///
/// Without a leading `---` line the whole text is body.
pub fn split_manifest(text: &str) -> Manifest<'_> {
    let mut lines = text.split('\n');
    if lines.next().map(str::trim) != Some("---") {
        return Manifest {
            fields: BTreeMap::new(),
            body: text,
        };
    }

    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut current_key: Option<String> = None;
    // Byte offset of the line after the opening delimiter
    let mut offset = text.find('\n').map_or(text.len(), |i| i + 1);
    let mut body = "";

    for line in lines {
        let next_offset = (offset + line.len() + 1).min(text.len());
        if line.trim() == "---" {
            body = &text[next_offset..];
            break;
        }
        if let Some(caps) = front_matter_key().captures(line) {
            let key = caps[1].trim().to_string();
            fields.insert(key.clone(), strip_quotes(&caps[2]));
            current_key = Some(key);
        } else if let Some(key) = current_key.as_ref().filter(|_| line.starts_with("  ")) {
            if let Some(value) = fields.get_mut(key) {
                value.push(' ');
                value.push_str(line.trim());
            }
        }
        offset = next_offset;
    }

    Manifest { fields, body }
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Trigger keywords named in the front-matter description.
pub fn triggers_from_description(description: &str) -> Vec<String> {
    let mut triggers = Vec::new();

    if let Some(caps) = ko_triggers().captures(description) {
        triggers.extend(split_list(&caps[1]).map(|t| strip_quotes(&t)));
    }

    if let Some(caps) = en_triggers().captures(description) {
        let raw = &caps[1];
        let quoted_items: Vec<String> = quoted()
            .captures_iter(raw)
            .map(|c| c[1].to_string())
            .collect();
        if quoted_items.is_empty() {
            triggers.extend(split_list(raw));
        } else {
            triggers.extend(quoted_items);
        }
    }

    if triggers.is_empty() {
        triggers.extend(quoted().captures_iter(description).map(|c| c[1].to_string()));
    }

    dedupe(triggers)
}

/// Trigger keywords listed as bullets under a triggers section of the body.
pub fn triggers_from_body(body: &str) -> Vec<String> {
    let Some(caps) = trigger_section().captures(body) else {
        return Vec::new();
    };

    let mut triggers = Vec::new();
    for line in caps[1].split('\n').map(str::trim) {
        if !(line.starts_with('-') || line.starts_with('*')) {
            continue;
        }
        let quoted_items: Vec<String> = quoted()
            .captures_iter(line)
            .map(|c| c[1].to_string())
            .collect();
        if quoted_items.is_empty() {
            triggers.extend(split_list(line.trim_start_matches(&['-', '*'][..]).trim()));
        } else {
            triggers.extend(quoted_items);
        }
    }
    dedupe(triggers)
}

/// Merge both trigger sources and tag where they came from.
pub fn extract_triggers(description: &str, body: &str) -> TriggerInfo {
    let from_description = triggers_from_description(description);
    let from_body = triggers_from_body(body);

    match (from_description.is_empty(), from_body.is_empty()) {
        (false, false) => TriggerInfo {
            keywords: dedupe([from_description, from_body].concat()),
            source: TriggerSource::Both,
        },
        (false, true) => TriggerInfo {
            keywords: from_description,
            source: TriggerSource::YamlDescription,
        },
        (true, false) => TriggerInfo {
            keywords: from_body,
            source: TriggerSource::MarkdownSection,
        },
        (true, true) => TriggerInfo::default(),
    }
}

/// `## ` headers of the body, in order
pub fn section_headers(body: &str) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for line in body.split('\n') {
        if let Some(header) = line.strip_prefix("## ") {
            let header = header.trim().to_string();
            if !headers.contains(&header) {
                headers.push(header);
            }
        }
    }
    headers
}

/// Which well-known sections a manifest has
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SectionFlags {
    pub when_to_use: bool,
    pub dont_use: bool,
    pub pipeline: bool,
    pub llm_judgment: bool,
    pub quick_start: bool,
    pub cli_options: bool,
    pub prerequisites: bool,
}

static SECTION_PATTERNS: OnceLock<[Regex; 7]> = OnceLock::new();

fn section_patterns() -> &'static [Regex; 7] {
    SECTION_PATTERNS.get_or_init(|| {
        [
            r"when to use|사용\s*조건|언제\s*사용",
            r"don'?t use|비목표|non-?goal|비사용",
            r"pipeline|파이프라인",
            r"llm.*판단|llm.*decision|자가\s*판단",
            r"quick\s*start|빠른\s*시작",
            r"cli.*옵션|cli.*option|command",
            r"prerequisit|사전\s*요구|설치|setup|환경",
        ]
        .map(|p| Regex::new(p).expect("valid regex"))
    })
}

pub fn section_flags(headers: &[String]) -> SectionFlags {
    let [when, dont, pipeline, llm, quick, cli, prereq] = section_patterns();
    let mut flags = SectionFlags::default();
    for header in headers {
        let h = header.to_lowercase();
        flags.when_to_use |= when.is_match(&h);
        flags.dont_use |= dont.is_match(&h);
        flags.pipeline |= pipeline.is_match(&h);
        flags.llm_judgment |= llm.is_match(&h);
        flags.quick_start |= quick.is_match(&h);
        flags.cli_options |= cli.is_match(&h);
        flags.prerequisites |= prereq.is_match(&h);
    }
    flags
}

/// Fenced code block count and distinct language tags
pub fn code_blocks(body: &str) -> (usize, Vec<String>) {
    let mut count = 0;
    let mut languages = Vec::new();
    for caps in code_block().captures_iter(body) {
        count += 1;
        let lang = caps[1].to_string();
        if !lang.is_empty() && !languages.contains(&lang) {
            languages.push(lang);
        }
    }
    (count, languages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_manifest_with_continuation() {
        let text = "---\nname: \"pdf-tools\"\ndescription: Handles PDFs.\n  Triggers on \"pdf\".\n---\n# Body\n";
        let manifest = split_manifest(text);
        assert_eq!(manifest.fields["name"], "pdf-tools");
        assert_eq!(
            manifest.fields["description"],
            "Handles PDFs. Triggers on \"pdf\"."
        );
        assert_eq!(manifest.body, "# Body\n");
    }

    #[test]
    fn test_split_manifest_without_front_matter() {
        let manifest = split_manifest("# Just a body");
        assert!(manifest.fields.is_empty());
        assert_eq!(manifest.body, "# Just a body");
    }

    #[test]
    fn test_split_manifest_unclosed() {
        let manifest = split_manifest("---\nname: x\n");
        assert_eq!(manifest.fields["name"], "x");
        assert_eq!(manifest.body, "");
    }

    #[test]
    fn test_korean_trigger_list() {
        let t = triggers_from_description("의존성 분석 도구. 트리거: 의존성, phantom, \"유령 패키지\". 끝");
        assert_eq!(t, vec!["의존성", "phantom", "유령 패키지"]);
    }

    #[test]
    fn test_english_triggers_quoted() {
        let t = triggers_from_description(r#"Audits deps. Triggers on "audit", "lockfile", "audit"."#);
        assert_eq!(t, vec!["audit", "lockfile"]);
    }

    #[test]
    fn test_english_triggers_plain_list() {
        let t = triggers_from_description("Triggers on pdf, merge pages, split.");
        assert_eq!(t, vec!["pdf", "merge pages", "split"]);
    }

    #[test]
    fn test_fallback_to_quoted_items() {
        let t = triggers_from_description(r#"Use for "charts" and "plots""#);
        assert_eq!(t, vec!["charts", "plots"]);
    }

    #[test]
    fn test_triggers_from_body_section() {
        let body = "# Title\n\n## 트리거\n- \"phantom\", \"팬텀\"\n- 유령 의존성, ghost\n\n## Next\n";
        assert_eq!(
            triggers_from_body(body),
            vec!["phantom", "팬텀", "유령 의존성", "ghost"]
        );
    }

    #[test]
    fn test_extract_triggers_source() {
        let both = extract_triggers("Triggers on \"a\".", "## Triggers\n- b\n");
        assert_eq!(both.source, TriggerSource::Both);
        assert_eq!(both.keywords, vec!["a", "b"]);

        let body_only = extract_triggers("", "## Triggers\n- b\n");
        assert_eq!(body_only.source, TriggerSource::MarkdownSection);

        let none = extract_triggers("plain", "no section");
        assert!(none.keywords.is_empty());
        assert_eq!(none.source, TriggerSource::YamlDescription);
    }

    #[test]
    fn test_section_flags() {
        let body = "## When to Use\nx\n## Non-Goals\n## Pipeline Integration\n## Quick Start\n## CLI Options\n## Setup\n## LLM Decision Guide\n";
        let flags = section_flags(&section_headers(body));
        assert_eq!(
            flags,
            SectionFlags {
                when_to_use: true,
                dont_use: true,
                pipeline: true,
                llm_judgment: true,
                quick_start: true,
                cli_options: true,
                prerequisites: true,
            }
        );
    }

    #[test]
    fn test_code_blocks() {
        let body = "```bash\nrun\n```\n\n```\nplain\n```\n```bash\nagain\n```\n";
        let (count, langs) = code_blocks(body);
        assert_eq!(count, 3);
        assert_eq!(langs, vec!["bash"]);
    }
}
