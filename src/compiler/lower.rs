//! Lowering: raw syntax tree → addressable graph.
//!
//! ```text
//! RawScript { topics, gambits (topic-less) }
//!    │ collapse        topic-less gambits → `random` topic (created if absent)
//!    │ split + assign  replies, then the gambit, get identifiers; topics keep
//!    │                 only the gambit identifiers
//!    v re-key          topics by name
//! ScriptGraph { topics, gambits, replies }
//! ```
//!
//! Processing follows source order so that a given script and scope always
//! yield the same identifiers. The only failure is a repeated topic name
//! under [`TopicConflict::Reject`].

use super::ids::IdGenerator;
use super::merge::TopicConflict;
use crate::{
    Conversation, Diagnostic, Gambit, RANDOM_TOPIC, RawScript, RawTopic, Reply, ScriptGraph, SourceError, Topic,
    Trigger,
};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::warn;

/// Lower one script. A topic name repeated within the script is combined,
/// or rejected under [`TopicConflict::Reject`]; `random` always combines.
pub(crate) fn lower(
    script: RawScript,
    ids: &mut IdGenerator,
    policy: TopicConflict,
) -> Result<(ScriptGraph, Vec<Diagnostic>), SourceError> {
    let topics = collapse_random(script);
    if policy == TopicConflict::Reject {
        reject_repeated(&topics)?;
    }

    let mut graph = ScriptGraph::default();
    let mut diagnostics = Vec::new();

    for raw in topics {
        let topic = split(raw, &mut graph, ids);
        match graph.topics.entry(topic.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(topic);
            }
            Entry::Occupied(mut slot) => {
                warn!(topic = %topic.name, "topic declared more than once in one script; combining");
                diagnostics.push(Diagnostic::DuplicateTopic { topic: topic.name.clone() });
                slot.get_mut().extend_with(topic);
            }
        }
    }

    Ok((graph, diagnostics))
}

fn reject_repeated(topics: &[RawTopic]) -> Result<(), SourceError> {
    for (idx, topic) in topics.iter().enumerate() {
        if topic.name != RANDOM_TOPIC && topics[..idx].iter().any(|t| t.name == topic.name) {
            return Err(SourceError::DuplicateTopic { name: topic.name.clone() });
        }
    }
    Ok(())
}

/// Move topic-less gambits into the `random` topic.
fn collapse_random(script: RawScript) -> Vec<RawTopic> {
    let RawScript { mut topics, gambits } = script;
    if gambits.is_empty() {
        return topics;
    }

    let idx = match topics.iter().position(|t| t.name == RANDOM_TOPIC) {
        Some(idx) => idx,
        None => {
            topics.push(RawTopic {
                name: RANDOM_TOPIC.to_string(),
                flags: BTreeMap::from([("keep".to_string(), "keep".to_string())]),
                ..RawTopic::default()
            });
            topics.len() - 1
        }
    };
    topics[idx].gambits.extend(gambits);
    topics
}

/// Give every reply and gambit of `raw` an identifier, store them in `graph`
/// and return the topic holding only references.
fn split(raw: RawTopic, graph: &mut ScriptGraph, ids: &mut IdGenerator) -> Topic {
    let mut gambit_ids = Vec::with_capacity(raw.gambits.len());

    for gambit in raw.gambits {
        let replies = gambit
            .replies
            .into_iter()
            .map(|text| {
                let id = ids.next_unused(|id| graph.replies.contains_key(id) || graph.gambits.contains_key(id));
                graph.replies.insert(id.clone(), Reply { id: id.clone(), text });
                id
            })
            .collect();

        let id = ids.next_unused(|id| graph.replies.contains_key(id) || graph.gambits.contains_key(id));
        graph.gambits.insert(
            id.clone(),
            Gambit {
                id: id.clone(),
                topic: raw.name.clone(),
                trigger: gambit.trigger.map(Trigger::new),
                replies,
                conversation: gambit.conversation.map(Conversation::new),
                redirect: gambit.redirect,
            },
        );
        gambit_ids.push(id);
    }

    Topic { name: raw.name, flags: raw.flags, keywords: raw.keywords, filter: raw.filter, gambits: gambit_ids }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawGambit;
    use pretty_assertions::assert_eq;

    fn gambit(trigger: &str, replies: &[&str]) -> RawGambit {
        RawGambit {
            trigger: Some(trigger.to_string()),
            replies: replies.iter().map(|r| r.to_string()).collect(),
            ..RawGambit::default()
        }
    }

    fn topic(name: &str, gambits: Vec<RawGambit>) -> RawTopic {
        RawTopic { name: name.to_string(), gambits, ..RawTopic::default() }
    }

    fn triggers(graph: &ScriptGraph, topic: &str) -> Vec<String> {
        graph.topics[topic]
            .gambits
            .iter()
            .map(|id| graph.gambits[id].trigger.as_ref().unwrap().raw.clone())
            .collect()
    }

    #[test]
    fn topic_less_gambits_collapse_into_a_new_random_topic() {
        let script = RawScript {
            topics: vec![topic("pets", vec![gambit("i like cats", &["me too"])])],
            gambits: vec![gambit("hello", &["hi"]), gambit("bye", &["see you"])],
        };

        let (graph, diagnostics) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Extend).unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(graph.topics.keys().collect::<Vec<_>>(), vec!["pets", RANDOM_TOPIC]);
        assert_eq!(triggers(&graph, RANDOM_TOPIC), vec!["hello", "bye"]);
        assert_eq!(graph.topics[RANDOM_TOPIC].flags.get("keep").map(String::as_str), Some("keep"));
    }

    #[test]
    fn topic_less_gambits_join_an_existing_random_topic() {
        let script = RawScript {
            topics: vec![topic(RANDOM_TOPIC, vec![gambit("first", &["1"])])],
            gambits: vec![gambit("second", &["2"])],
        };

        let (graph, _) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Extend).unwrap();

        assert_eq!(graph.topics.len(), 1);
        assert_eq!(triggers(&graph, RANDOM_TOPIC), vec!["first", "second"]);
        assert!(graph.topics[RANDOM_TOPIC].flags.is_empty());
    }

    #[test]
    fn no_topic_less_gambits_no_random_topic() {
        let script = RawScript { topics: vec![topic("pets", vec![gambit("cats", &["meow"])])], gambits: vec![] };
        let (graph, _) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Extend).unwrap();
        assert!(!graph.topics.contains_key(RANDOM_TOPIC));
    }

    #[test]
    fn every_reference_resolves() {
        let script = RawScript {
            topics: vec![
                topic("pets", vec![gambit("cats", &["meow", "purr"]), gambit("dogs", &["woof"])]),
                topic("food", vec![gambit("pizza", &["yum"])]),
            ],
            gambits: vec![gambit("hi", &["hello"])],
        };

        let (graph, _) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Extend).unwrap();

        assert!(graph.is_closed());
        assert_eq!(graph.gambits.len(), 4);
        assert_eq!(graph.replies.len(), 5);
        for (name, topic) in &graph.topics {
            for id in &topic.gambits {
                assert_eq!(&graph.gambits[id].topic, name);
            }
        }
    }

    #[test]
    fn redirects_keep_an_empty_reply_list() {
        let mut redirect = gambit("hey", &[]);
        redirect.redirect = Some("hello".to_string());
        let script = RawScript { topics: vec![], gambits: vec![gambit("hello", &["hi"]), redirect] };

        let (graph, _) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Extend).unwrap();
        let hey = graph.gambits.values().find(|g| g.redirect.is_some()).unwrap();
        assert!(hey.replies.is_empty());
        assert_eq!(hey.redirect.as_deref(), Some("hello"));
    }

    #[test]
    fn lowering_is_deterministic_for_a_scope() {
        let script = RawScript {
            topics: vec![topic("pets", vec![gambit("cats", &["meow"])])],
            gambits: vec![gambit("hi", &["hello"])],
        };

        let (a, _) = lower(script.clone(), &mut IdGenerator::scoped("chat/main.ss"), TopicConflict::Extend).unwrap();
        let (b, _) = lower(script, &mut IdGenerator::scoped("chat/main.ss"), TopicConflict::Extend).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn repeated_topic_names_are_combined() {
        let script = RawScript {
            topics: vec![topic("pets", vec![gambit("cats", &["meow"])]), topic("pets", vec![gambit("dogs", &["woof"])])],
            gambits: vec![],
        };

        let (graph, diagnostics) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Extend).unwrap();

        assert_eq!(triggers(&graph, "pets"), vec!["cats", "dogs"]);
        assert_eq!(diagnostics, vec![Diagnostic::DuplicateTopic { topic: "pets".to_string() }]);
    }

    #[test]
    fn repeated_topic_names_are_rejected_when_strict() {
        let script = RawScript {
            topics: vec![topic("pets", vec![gambit("cats", &["meow"])]), topic("pets", vec![gambit("dogs", &["woof"])])],
            gambits: vec![],
        };

        let err = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Reject).unwrap_err();
        assert!(matches!(err, SourceError::DuplicateTopic { ref name } if name == "pets"));
    }

    #[test]
    fn repeated_random_topics_combine_even_when_strict() {
        let script = RawScript {
            topics: vec![
                topic(RANDOM_TOPIC, vec![gambit("hi", &["hello"])]),
                topic(RANDOM_TOPIC, vec![gambit("bye", &["ciao"])]),
            ],
            gambits: vec![gambit("hey", &["yo"])],
        };

        let (graph, _) = lower(script, &mut IdGenerator::scoped("test"), TopicConflict::Reject).unwrap();
        assert_eq!(triggers(&graph, RANDOM_TOPIC), vec!["hi", "hey", "bye"]);
    }
}
