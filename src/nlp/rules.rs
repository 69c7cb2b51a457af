//! Keyword rules and sentence-boundary helpers for relation classification.

use std::{fs, path::Path};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::info;

use crate::error::{ExtractError, Result};

/// Punctuation that ends a clause for pairing purposes.
pub const SENTENCE_TERMINALS: &[char] = &['。', '！', '？', '!', '?', ';', '；', '\n'];

static DEFAULT_KEYWORDS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("父亲", "父亲"),
        ("母亲", "母亲"),
        ("儿子", "儿子"),
        ("女儿", "女儿"),
        ("爷爷", "爷爷"),
        ("奶奶", "奶奶"),
        ("祖母", "奶奶"),
        ("孙子", "孙子"),
        ("哥哥", "哥哥"),
        ("弟弟", "弟弟"),
        ("姐姐", "姐姐"),
        ("妹妹", "妹妹"),
        ("兄弟", "兄弟"),
        ("姐妹", "姐妹"),
        ("妻", "妻"),
        ("丈夫", "丈夫"),
        ("夫妻", "夫妻"),
        ("妾", "妾"),
        ("二房", "二房"),
        ("嫂子", "嫂子"),
        ("丫环", "丫环"),
        ("丫鬟", "丫环"),
        ("丫头", "丫头"),
        ("小厮", "小厮"),
        ("乳母", "乳母"),
        ("朋友", "朋友"),
        ("好友", "朋友"),
        ("好兄弟", "兄弟"),
        ("相好", "相好"),
        ("交接", "朋友"),
        ("相识", "朋友"),
        ("相交", "朋友"),
        ("结交", "朋友"),
        ("故交", "朋友"),
        ("旧交", "朋友"),
        ("相知", "朋友"),
        ("相与", "朋友"),
        ("会友", "朋友"),
        ("相逢", "朋友"),
        ("相会", "朋友"),
        ("老师", "老师"),
        ("西席", "老师"),
        ("弟子", "学生"),
        ("学生", "学生"),
        ("伯父", "伯父"),
        ("姑母", "姑母"),
        ("姑妈", "姑母"),
        ("侄女", "侄女"),
        ("侄儿", "侄儿"),
        ("外祖母", "外祖母"),
        ("外孙女", "外孙女"),
    ]
});

/// Byte offsets of an entity pair's first occurrences, ordered by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairSpan {
    /// Start of the earlier entity.
    pub lo: usize,
    /// End of the earlier entity, clamped so it never passes `hi`.
    pub lo_end: usize,
    /// Start of the later entity.
    pub hi: usize,
}

impl PairSpan {
    /// `None` when either entity does not occur in `text`.
    pub fn locate(text: &str, e1: &str, e2: &str) -> Option<Self> {
        let p1 = text.find(e1)?;
        let p2 = text.find(e2)?;
        let ((lo, lo_len), hi) = if p1 <= p2 {
            ((p1, e1.len()), p2)
        } else {
            ((p2, e2.len()), p1)
        };
        Some(Self {
            lo,
            lo_end: (lo + lo_len).min(hi),
            hi,
        })
    }

    /// True when a sentence terminal sits between the two start offsets.
    pub fn crosses_boundary(&self, text: &str) -> bool {
        text[self.lo..self.hi].contains(SENTENCE_TERMINALS)
    }

    /// Text strictly between the two entities.
    pub fn between<'t>(&self, text: &'t str) -> &'t str {
        &text[self.lo_end..self.hi]
    }

    /// The clause containing both entities: widened from `lo` and `hi`
    /// until a terminal or the string edge.
    pub fn segment<'t>(&self, text: &'t str) -> &'t str {
        let start = text[..self.lo]
            .char_indices()
            .rev()
            .find(|(_, c)| SENTENCE_TERMINALS.contains(c))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let end = text[self.hi..]
            .find(SENTENCE_TERMINALS)
            .map(|i| self.hi + i)
            .unwrap_or(text.len());
        &text[start..end]
    }
}

/// Ordered keyword → relation table. Lookup order is table order.
#[derive(Debug, Clone)]
pub struct RelationRules {
    table: IndexMap<String, String>,
}

impl Default for RelationRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEYWORDS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }
}

impl RelationRules {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            table: entries.into_iter().collect(),
        }
    }

    /// Read `keyword<TAB>relation` lines. Blank lines and `#` comments are
    /// ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((keyword, relation)) = line.split_once('\t') else {
                return Err(ExtractError::Dataset {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: "expected `keyword<TAB>relation`".to_string(),
                });
            };
            entries.push((keyword.trim().to_string(), relation.trim().to_string()));
        }
        let rules = Self::new(entries);
        info!(path = %path.display(), keywords = rules.len(), "loaded relation rules");
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// First relation whose keyword occurs in `haystack`.
    pub fn first_match(&self, haystack: &str) -> Option<&str> {
        self.table
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, relation)| relation.as_str())
    }

    /// Keyword decision for one pair, or `None` to defer to the statistical
    /// model. The text between the entities is searched before the whole
    /// clause.
    pub fn classify(&self, text: &str, e1: &str, e2: &str) -> Option<&str> {
        let span = PairSpan::locate(text, e1, e2)?;
        if span.crosses_boundary(text) {
            return None;
        }
        let segment = span.segment(text);
        if !segment.contains(e1) || !segment.contains(e2) {
            return None;
        }
        self.first_match(span.between(text))
            .or_else(|| self.first_match(segment))
    }
}
