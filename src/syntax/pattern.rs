//! Trigger pattern grammar.
//!
//! Turns the author-facing wildcard syntax into the regex dialect the
//! dialogue runtime matches with:
//!
//! ```text
//! *          any text                 (.*?)
//! *2         exactly two words        (\S+(?:\s+\S+){1})
//! *~2        up to two words          ((?:\S+\s*){0,2})
//! *(1-3)     one to three words       ((?:\S+\s*){1,3})
//! (a|b c)    alternation              (a|b c)
//! [a|b]      optional                 (?:a|b)?
//! ~animal    concept, kept verbatim   ~animal
//! ```
//!
//! Literal words lose sentence punctuation and have regex metacharacters
//! escaped. Words, concepts and alternations are joined by a single space;
//! anything touching a wildcard or optional group is joined by `\s*` so an
//! absent optional does not leave a double space to match.

use std::fmt;

/// Canonical ("clean") form of a trigger or conversation pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPattern {
    pub clean: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    pub message: String,
    /// Byte offset into the pattern text where the problem was found.
    pub offset: usize,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for PatternError {}

/// Canonicalizes raw pattern text.
pub trait PatternGrammar: Send + Sync + fmt::Debug {
    fn parse(&self, text: &str) -> Result<CanonicalPattern, PatternError>;
}

/// The built-in grammar described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerGrammar;

impl PatternGrammar for TriggerGrammar {
    fn parse(&self, text: &str) -> Result<CanonicalPattern, PatternError> {
        let pieces = tokenize(text)?;
        Ok(CanonicalPattern { clean: render(&pieces) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Word(String),
    Concept(String),
    Alternation(Vec<String>),
    Optional(Vec<String>),
    AnyText,
    ExactWords(u32),
    UpToWords(u32),
    WordRange(u32, u32),
}

impl Piece {
    /// Pieces that always consume at least one word and can sit next to a
    /// literal space.
    fn is_solid(&self) -> bool {
        matches!(self, Piece::Word(_) | Piece::Concept(_) | Piece::Alternation(_))
    }

    fn render(&self) -> String {
        match self {
            Piece::Word(w) => w.clone(),
            Piece::Concept(c) => format!("~{c}"),
            Piece::Alternation(alts) => format!("({})", alts.join("|")),
            Piece::Optional(alts) => format!("(?:{})?", alts.join("|")),
            Piece::AnyText => "(.*?)".to_string(),
            Piece::ExactWords(n) => format!(r"(\S+(?:\s+\S+){{{}}})", n - 1),
            Piece::UpToWords(n) => format!(r"((?:\S+\s*){{0,{n}}})"),
            Piece::WordRange(lo, hi) => format!(r"((?:\S+\s*){{{lo},{hi}}})"),
        }
    }
}

fn render(pieces: &[Piece]) -> String {
    let mut out = String::new();
    for (idx, piece) in pieces.iter().enumerate() {
        if idx > 0 {
            let prev = &pieces[idx - 1];
            out.push_str(if prev.is_solid() && piece.is_solid() { " " } else { r"\s*" });
        }
        out.push_str(&piece.render());
    }
    out
}

const SENTENCE_PUNCTUATION: &[char] = &['?', '!', '.', ',', ';', ':'];

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '*' | '(' | ')' | '[' | ']' | '~' | '|')
}

fn tokenize(text: &str) -> Result<Vec<Piece>, PatternError> {
    let mut pieces = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '*' => {
                chars.next();
                pieces.push(wildcard(text, offset, &mut chars)?);
            }
            '(' | '[' => {
                chars.next();
                let close = if c == '(' { ')' } else { ']' };
                let body_start = offset + 1;
                let mut body_end = None;
                for (i, ch) in chars.by_ref() {
                    if ch == close {
                        body_end = Some(i);
                        break;
                    }
                }
                let Some(body_end) = body_end else {
                    return Err(PatternError { message: format!("unterminated '{c}'"), offset });
                };
                let alts = alternatives(&text[body_start..body_end], offset)?;
                pieces.push(if c == '(' { Piece::Alternation(alts) } else { Piece::Optional(alts) });
            }
            ')' | ']' | '|' => {
                return Err(PatternError { message: format!("unexpected '{c}'"), offset });
            }
            '~' => {
                chars.next();
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(PatternError { message: "expected a concept name after '~'".to_string(), offset });
                }
                pieces.push(Piece::Concept(name));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if is_boundary(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                let word = literal(&word);
                if !word.is_empty() {
                    pieces.push(Piece::Word(word));
                }
            }
        }
    }

    Ok(pieces)
}

/// Parse what follows a `*`: a count, `~count`, `(lo-hi)` or nothing.
fn wildcard<I>(text: &str, offset: usize, chars: &mut std::iter::Peekable<I>) -> Result<Piece, PatternError>
where
    I: Iterator<Item = (usize, char)>,
{
    match chars.peek().map(|&(_, c)| c) {
        Some(c) if c.is_ascii_digit() => match read_number(chars) {
            Some(0) => Err(PatternError { message: "'*0' matches nothing".to_string(), offset }),
            Some(n) => Ok(Piece::ExactWords(n)),
            None => Err(PatternError { message: "word count is too large".to_string(), offset }),
        },
        Some('~') => {
            chars.next();
            read_number(chars)
                .map(Piece::UpToWords)
                .ok_or_else(|| PatternError { message: "expected a word count after '*~'".to_string(), offset })
        }
        Some('(') => {
            let rest = &text[offset + 1..];
            let Some(end) = rest.find(')') else {
                return Err(PatternError { message: "unterminated '*(' range".to_string(), offset });
            };
            let range = &rest[1..end];
            let bounds = range
                .split_once('-')
                .and_then(|(lo, hi)| Some((lo.trim().parse::<u32>().ok()?, hi.trim().parse::<u32>().ok()?)));
            // `*(a|b)` is a wildcard followed by an alternation, not a range.
            let Some((lo, hi)) = bounds else {
                return Ok(Piece::AnyText);
            };
            if lo > hi {
                return Err(PatternError { message: format!("invalid word range '{range}'"), offset });
            }
            let consumed_until = offset + 1 + end;
            while chars.next_if(|&(i, _)| i <= consumed_until).is_some() {}
            Ok(Piece::WordRange(lo, hi))
        }
        _ => Ok(Piece::AnyText),
    }
}

fn alternatives(body: &str, offset: usize) -> Result<Vec<String>, PatternError> {
    let alts: Vec<String> = body
        .split('|')
        .map(|alt| alt.split_whitespace().map(literal).filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
        .filter(|alt| !alt.is_empty())
        .collect();
    if alts.is_empty() {
        return Err(PatternError { message: "empty alternation".to_string(), offset });
    }
    Ok(alts)
}

fn read_number<I>(chars: &mut std::iter::Peekable<I>) -> Option<u32>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut digits = String::new();
    while let Some((_, ch)) = chars.next_if(|&(_, ch)| ch.is_ascii_digit()) {
        digits.push(ch);
    }
    digits.parse().ok()
}

/// Strip sentence punctuation and escape whatever regex syntax remains.
fn literal(word: &str) -> String {
    let stripped: String = word.chars().filter(|c| !SENTENCE_PUNCTUATION.contains(c)).collect();
    regex::escape(&stripped)
}
