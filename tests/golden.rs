//! Integration tests over the golden vectors and general testable
//! properties, encoded the way the teacher's pedagogical translations
//! hand-check their own NFA construction: plain `assert!`s against
//! `Regex::is_match`/`Regex::find`, no test-framework dependency.

use tnfa::Regex;

// ---- seven golden scenarios -------------------------------------------

#[test]
fn golden_1_bounded_repetition_exact_match() {
    let re = Regex::compile("(ab[e-h]){3,3}").unwrap();
    assert!(re.is_match(b"abeabfabh"));
}

#[test]
fn golden_2_bounded_repetition_exact_search_with_trailer() {
    let re = Regex::compile("(ab[e-h]){3,3}").unwrap();
    let found = re.find(b"abeabfabhRabe").unwrap();
    assert_eq!(found, 9);
}

#[test]
fn golden_3_class_and_alternation_full_match() {
    let re = Regex::compile("[^a-zA-Z0-9]*([x-zep]|RE)+").unwrap();
    assert!(re.is_match(b"$&^#xxyzyyeREREREepyyp"));
}

#[test]
fn golden_4_class_and_alternation_longest_prefix_search() {
    let re = Regex::compile("[^a-zA-Z0-9]*([x-zep]|RE)+").unwrap();
    let haystack = b"$&^#xxyzyyepREREREepyypARE";
    let found = re.find(haystack).unwrap();
    // the trailing "ARE" can't extend the match: 'A' is not in the body
    // alternation and isn't consumed by the leading negated class either,
    // so the longest accepting prefix stops right before it.
    assert_eq!(found, haystack.len() - "ARE".len());
}

#[test]
fn golden_5_nested_groups_and_trailing_quantified_anchor_char_match() {
    let pattern = "$(sr|(ab*c+|[f-h]+|(rep)*){2,5}|s*)${3,6}";
    let re = Regex::compile(pattern).unwrap();
    assert!(re.is_match(b"$abbbbbcccreprepfghgrepreph$$$$"));
}

#[test]
fn golden_6_same_pattern_truncated_input_fails() {
    let pattern = "$(sr|(ab*c+|[f-h]+|(rep)*){2,5}|s*)${3,6}";
    let re = Regex::compile(pattern).unwrap();
    // only two trailing '$' now, short of the {3,6} minimum of three.
    assert!(!re.is_match(b"$abbbbbcccreprepfghgrepreph$$"));
}

#[test]
fn golden_7_unbalanced_paren_is_a_compile_error() {
    assert!(Regex::compile("(ab|(c+d|[e-h]+z)e").is_err());
}

// ---- general testable properties (spec's quantifier identities, class
// duality, escape round-trip, alternation commutativity, longest match) --

#[test]
fn quantifier_identity_question_mark() {
    let a = Regex::compile("a?").unwrap();
    let b = Regex::compile("a{0,1}").unwrap();
    for s in [&b""[..], b"a"] {
        assert_eq!(a.is_match(s), b.is_match(s));
    }
    assert!(!a.is_match(b"aa"));
}

#[test]
fn quantifier_identity_star() {
    let a = Regex::compile("a*").unwrap();
    let b = Regex::compile("a{0,}").unwrap();
    for s in [&b""[..], b"a", b"aaaaa"] {
        assert_eq!(a.is_match(s), b.is_match(s));
    }
}

#[test]
fn quantifier_identity_plus() {
    let a = Regex::compile("a+").unwrap();
    let b = Regex::compile("a{1,}").unwrap();
    for s in [&b""[..], b"a", b"aaaaa"] {
        assert_eq!(a.is_match(s), b.is_match(s));
    }
}

#[test]
fn quantifier_identity_exact_is_subset_of_unbounded() {
    // L(x{n}) subset L(x{n,}): per spec.md's no-comma {m} rule, a bare
    // `{m}` (no comma seen) means "m or more", same as `{m,}` - so the two
    // patterns accept exactly the same language here.
    let exact = Regex::compile("a{3}").unwrap();
    let unbounded = Regex::compile("a{3,}").unwrap();
    assert!(!exact.is_match(b"aa"));
    assert!(!unbounded.is_match(b"aa"));
    assert!(exact.is_match(b"aaa"));
    assert!(unbounded.is_match(b"aaa"));
    assert!(exact.is_match(b"aaaa"));
    assert!(unbounded.is_match(b"aaaa"));
}

#[test]
fn alternation_is_commutative_at_the_language_level() {
    let ab = Regex::compile("cat|dog").unwrap();
    let ba = Regex::compile("dog|cat").unwrap();
    for s in [&b"cat"[..], b"dog", b"cow"] {
        assert_eq!(ab.is_match(s), ba.is_match(s));
    }
}

#[test]
fn class_and_negation_are_dual() {
    let pos = Regex::compile("[abc]").unwrap();
    let neg = Regex::compile("[^abc]").unwrap();
    for b in 0u8..=255 {
        assert_ne!(pos.is_match(&[b]), neg.is_match(&[b]));
    }
}

#[test]
fn escape_round_trips_every_metacharacter() {
    for m in [
        '(', ')', '*', '|', '+', '?', '.', '{', '}', ',', '[', ']', '-', '^', '\\',
    ] {
        let pattern = format!("\\{m}");
        let re = Regex::compile(&pattern).unwrap();
        assert!(re.is_match(m.to_string().as_bytes()));
    }
}

#[test]
fn search_returns_the_longest_accepting_prefix_not_the_first() {
    let re = Regex::compile("a*").unwrap();
    assert_eq!(re.find(b"aaab"), Some(3));
}

#[test]
fn match_and_search_agree_when_the_match_spans_the_whole_input() {
    let re = Regex::compile("(ab[e-h]){3,3}").unwrap();
    let s = b"abeabfabh";
    assert_eq!(re.is_match(s), re.find(s) == Some(s.len()));
}
