use super::*;
use crate::{RawGambit, RawScript, RawTopic};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

#[test]
fn canonicalize_examples() {
    // (input, expected)
    let cases: Vec<(&str, &str)> = vec![
        ("Hello There", "hello there"),
        ("I'm here", "i am here"),
        ("I’m here", "i am here"),
        ("Don't go", "do not go"),
        ("I can't", "i cannot"),
        ("I won't", "i will not"),
        ("It's OK", "it is ok"),
        ("they're late", "they are late"),
        ("We'll   see", "we will see"),
        ("I've got it", "i have got it"),
        ("you'd know", "you would know"),
        ("let's go", "let us go"),
        ("you & me", "you and me"),
        ("  spaced \t out  ", "spaced out"),
        ("*~2 [hi|hey] ~animal", "*~2 [hi|hey] ~animal"),
    ];

    for (input, expected) in cases {
        assert_eq!(canonicalize(input), expected, "input: {input}");
    }
}

#[test]
fn pattern_examples() {
    // (input, expected clean)
    let cases: Vec<(&str, &str)> = vec![
        ("hello there", "hello there"),
        ("what is your name?", "what is your name"),
        ("*", "(.*?)"),
        ("hi *", r"hi\s*(.*?)"),
        ("i am *1 years old", r"i am\s*(\S+(?:\s+\S+){0})\s*years old"),
        ("*2", r"(\S+(?:\s+\S+){1})"),
        ("*~2 cat", r"((?:\S+\s*){0,2})\s*cat"),
        ("*(1-3) cat", r"((?:\S+\s*){1,3})\s*cat"),
        ("*(a|b)", r"(.*?)\s*(a|b)"),
        ("(hi|hey) there", "(hi|hey) there"),
        ("(hi | hey there) bot", "(hi|hey there) bot"),
        ("[good] morning", r"(?:good)?\s*morning"),
        ("i like ~animal", "i like ~animal"),
        ("1+1", r"1\+1"),
    ];

    for (input, expected) in cases {
        let out = TriggerGrammar.parse(input).unwrap_or_else(|err| panic!("{input}: {err}"));
        assert_eq!(out.clean, expected, "input: {input}");
    }
}

#[test]
fn pattern_errors() {
    // (input, message fragment)
    let cases: Vec<(&str, &str)> = vec![
        ("hello (there", "unterminated '('"),
        ("hello [there", "unterminated '['"),
        ("hi )", "unexpected ')'"),
        ("a | b", "unexpected '|'"),
        ("~ cat", "concept name"),
        ("*0", "'*0'"),
        ("*~x", "word count"),
        ("*(3-1)", "invalid word range"),
        ("*(1-2", "unterminated '*('"),
        ("()", "empty alternation"),
    ];

    for (input, fragment) in cases {
        let err = TriggerGrammar.parse(input).unwrap_err();
        assert!(err.message.contains(fragment), "input: {input}, got: {err}");
    }
}

#[test]
fn pattern_errors_carry_offsets() {
    let err = TriggerGrammar.parse("hello (there").unwrap_err();
    assert_eq!(err.offset, 6);
}

#[test]
fn parses_a_full_script() {
    let text = "\
// greetings
+ hello
- Hi there!
- Hey.
^ Nice to see you.
> topic pets {keep, system=no} (cat dog) ^likes(pets)
+ i like ~animal
- What kind?
+ *
% what kind
- Lovely.
< topic
+ hey
@ hello
";

    let script = ScriptParser.parse(text).unwrap();

    let expected = RawScript {
        topics: vec![RawTopic {
            name: "pets".to_string(),
            flags: BTreeMap::from([
                ("keep".to_string(), "keep".to_string()),
                ("system".to_string(), "no".to_string()),
            ]),
            keywords: vec!["cat".to_string(), "dog".to_string()],
            filter: Some("likes(pets)".to_string()),
            gambits: vec![
                RawGambit {
                    trigger: Some("i like ~animal".to_string()),
                    replies: vec!["What kind?".to_string()],
                    ..RawGambit::default()
                },
                RawGambit {
                    trigger: Some("*".to_string()),
                    replies: vec!["Lovely.".to_string()],
                    conversation: Some("what kind".to_string()),
                    redirect: None,
                },
            ],
        }],
        gambits: vec![
            RawGambit {
                trigger: Some("hello".to_string()),
                replies: vec!["Hi there!".to_string(), "Hey. Nice to see you.".to_string()],
                ..RawGambit::default()
            },
            RawGambit { trigger: Some("hey".to_string()), redirect: Some("hello".to_string()), ..RawGambit::default() },
        ],
    };

    assert_eq!(script, expected);
}

#[test]
fn unclosed_topics_are_closed_at_end_of_input() {
    let script = ScriptParser.parse("> topic food\n+ pizza\n- yum\n").unwrap();
    assert_eq!(script.topics.len(), 1);
    assert_eq!(script.topics[0].gambits.len(), 1);
    assert!(script.gambits.is_empty());
}

#[test]
fn syntax_errors() {
    // (input, line, message fragment)
    let cases: Vec<(&str, usize, &str)> = vec![
        ("- orphan reply\n", 1, "reply without a preceding trigger"),
        ("+ hi\n- hello\n? what\n", 3, "expected one of"),
        ("> topic a\n> topic b\n", 2, "still open"),
        ("< topic\n", 1, "without an open topic"),
        ("+\n", 1, "trigger text is empty"),
        ("+ hi\n% a\n% b\n", 3, "already has a conversation"),
        ("^ more\n", 1, "continuation without a preceding trigger"),
        ("+ hi\n^ more\n", 2, "continuation without a reply"),
        ("> pets\n", 1, "expected '> topic"),
        ("+ hi\n- hello\n> topic a\n- stray\n", 4, "reply without a preceding trigger"),
    ];

    for (input, line, fragment) in cases {
        let err = ScriptParser.parse(input).unwrap_err();
        assert_eq!(err.line, line, "input: {input:?}");
        assert!(err.message.contains(fragment), "input: {input:?}, got: {err}");
    }
}
