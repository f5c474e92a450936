//! Line-oriented script parser.
//!
//! Input is the preprocessed script (trimmed, non-blank lines ending in a
//! newline). Each line starts with a sigil:
//!
//! ```text
//! // comment
//! > topic pets {keep, system=no} (cat dog) ^likes(pets)
//! + i like ~animal            trigger, starts a gambit
//! - What kind?                reply to the current gambit
//! ^ Tell me more.             continues the last reply
//! % what kind                 conversation: only after a matching reply
//! @ hello                     redirect to another trigger
//! < topic
//! ```
//!
//! Gambits outside `> topic` / `< topic` are topic-less and end up in
//! [`RawScript::gambits`]. A topic still open at end of input is closed.

use crate::{RawGambit, RawScript, RawTopic};
use std::collections::BTreeMap;
use std::fmt;

/// A rejected script, shaped after the grammar diagnostics authors are used
/// to: what was found, why it is wrong, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub found: String,
    pub message: String,
    /// 1-based line number in the parsed text.
    pub line: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} (found '{}')", self.line, self.message, self.found)
    }
}

impl std::error::Error for SyntaxError {}

/// Turns preprocessed script text into a raw syntax tree.
pub trait SyntaxParser: Send + Sync + fmt::Debug {
    fn parse(&self, text: &str) -> Result<RawScript, SyntaxError>;
}

/// The built-in script dialect described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptParser;

impl SyntaxParser for ScriptParser {
    fn parse(&self, text: &str) -> Result<RawScript, SyntaxError> {
        let mut state = ParseState::default();
        for (idx, line) in text.lines().enumerate() {
            state.line(idx + 1, line.trim())?;
        }
        Ok(state.finish())
    }
}

#[derive(Default)]
struct ParseState {
    script: RawScript,
    open_topic: Option<RawTopic>,
    /// False until a `+` line; topic boundaries end the current gambit.
    in_gambit: bool,
}

impl ParseState {
    fn line(&mut self, number: usize, line: &str) -> Result<(), SyntaxError> {
        if line.is_empty() || line.starts_with("//") {
            return Ok(());
        }

        let err = |found: &str, message: &str| SyntaxError {
            found: found.to_string(),
            message: message.to_string(),
            line: number,
        };

        let (sigil, rest) = line.split_at(line.chars().next().map_or(0, char::len_utf8));
        let rest = rest.trim();

        match sigil {
            ">" => self.open(rest).map_err(|message| err(line, &message)),
            "<" => {
                if rest != "topic" {
                    return Err(err(line, "expected '< topic'"));
                }
                let topic = self.open_topic.take().ok_or_else(|| err(line, "'< topic' without an open topic"))?;
                self.script.topics.push(topic);
                self.in_gambit = false;
                Ok(())
            }
            "+" => {
                if rest.is_empty() {
                    return Err(err(sigil, "trigger text is empty"));
                }
                self.gambits().push(RawGambit { trigger: Some(rest.to_string()), ..RawGambit::default() });
                self.in_gambit = true;
                Ok(())
            }
            "-" => {
                if rest.is_empty() {
                    return Err(err(sigil, "reply text is empty"));
                }
                let gambit = self.current().ok_or_else(|| err(sigil, "reply without a preceding trigger"))?;
                gambit.replies.push(rest.to_string());
                Ok(())
            }
            "^" => {
                let gambit = self.current().ok_or_else(|| err(sigil, "continuation without a preceding trigger"))?;
                let reply = gambit.replies.last_mut().ok_or_else(|| err(sigil, "continuation without a reply"))?;
                if !rest.is_empty() {
                    reply.push(' ');
                    reply.push_str(rest);
                }
                Ok(())
            }
            "%" => {
                let gambit = self.current().ok_or_else(|| err(sigil, "conversation without a preceding trigger"))?;
                if gambit.conversation.is_some() {
                    return Err(err(line, "gambit already has a conversation"));
                }
                if rest.is_empty() {
                    return Err(err(sigil, "conversation pattern is empty"));
                }
                gambit.conversation = Some(rest.to_string());
                Ok(())
            }
            "@" => {
                let gambit = self.current().ok_or_else(|| err(sigil, "redirect without a preceding trigger"))?;
                if rest.is_empty() {
                    return Err(err(sigil, "redirect target is empty"));
                }
                gambit.redirect = Some(rest.to_string());
                Ok(())
            }
            _ => Err(err(sigil, "expected one of '>', '<', '+', '-', '^', '%', '@' or a '//' comment")),
        }
    }

    /// Parse the remainder of a `> topic ...` line.
    fn open(&mut self, header: &str) -> Result<(), String> {
        let caps = regex!(
            r"^topic\s+(?P<name>[\w~-]+)(?:\s*\{(?P<flags>[^}]*)\})?(?:\s*\((?P<keywords>[^)]*)\))?(?:\s*\^(?P<filter>.+))?$"
        )
        .captures(header)
        .ok_or_else(|| "expected '> topic <name> [{flags}] [(keywords)] [^filter]'".to_string())?;

        if let Some(open) = &self.open_topic {
            return Err(format!("topic '{}' is still open", open.name));
        }

        let flags: BTreeMap<String, String> = caps
            .name("flags")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(|f| match f.split_once('=') {
                        Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
                        None => (f.to_string(), f.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let keywords = caps
            .name("keywords")
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        self.open_topic = Some(RawTopic {
            name: caps["name"].to_string(),
            flags,
            keywords,
            filter: caps.name("filter").map(|m| m.as_str().trim().to_string()),
            gambits: Vec::new(),
        });
        self.in_gambit = false;
        Ok(())
    }

    fn gambits(&mut self) -> &mut Vec<RawGambit> {
        match &mut self.open_topic {
            Some(topic) => &mut topic.gambits,
            None => &mut self.script.gambits,
        }
    }

    fn current(&mut self) -> Option<&mut RawGambit> {
        if !self.in_gambit {
            return None;
        }
        self.gambits().last_mut()
    }

    fn finish(mut self) -> RawScript {
        if let Some(topic) = self.open_topic.take() {
            self.script.topics.push(topic);
        }
        self.script
    }
}
