// Tests for turn transcript assembly
//
// Partial transcriptions for both sides arrive interleaved; a completed turn
// must always emit the user message before the agent message, and
// whitespace-only accumulations must emit nothing.

use aether_voice::{Speaker, TranscriptAggregator};

#[test]
fn partials_concatenate_into_one_message() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_input("hel");
    aggregator.append_input("lo");

    let messages = aggregator.complete_turn();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].speaker, Speaker::User);
    assert_eq!(messages[0].text, "hello");

    // Both accumulators are empty afterwards
    assert!(aggregator.pending_input().is_empty());
    assert!(aggregator.pending_output().is_empty());
}

#[test]
fn user_message_precedes_agent_message() {
    // Agent partials arriving first must not change the emitted order
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_output("sure, ");
    aggregator.append_input("play ");
    aggregator.append_output("one moment");
    aggregator.append_input("the drums");

    let messages = aggregator.complete_turn();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].speaker, Speaker::User);
    assert_eq!(messages[0].text, "play the drums");
    assert_eq!(messages[1].speaker, Speaker::Agent);
    assert_eq!(messages[1].text, "sure, one moment");
}

#[test]
fn one_sided_turn_emits_single_message() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_output("hello there");

    let messages = aggregator.complete_turn();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].speaker, Speaker::Agent);
    assert_eq!(messages[0].text, "hello there");
}

#[test]
fn whitespace_only_turn_emits_nothing() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_input("   ");
    aggregator.append_output("\n\t ");

    assert!(aggregator.complete_turn().is_empty());
}

#[test]
fn completing_an_empty_turn_emits_nothing() {
    let mut aggregator = TranscriptAggregator::new();
    assert!(aggregator.complete_turn().is_empty());
}

#[test]
fn flush_does_not_leak_into_the_next_turn() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_input("first turn");
    assert_eq!(aggregator.complete_turn().len(), 1);

    // A second completion right away has nothing to say
    assert!(aggregator.complete_turn().is_empty());

    aggregator.append_input("second turn");
    let messages = aggregator.complete_turn();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "second turn");
}

#[test]
fn clear_discards_partials_without_emitting() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_input("half a sen");
    aggregator.append_output("tence");
    aggregator.clear();

    assert!(aggregator.complete_turn().is_empty());
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.append_input("  turn it up  ");

    let messages = aggregator.complete_turn();
    assert_eq!(messages[0].text, "turn it up");
}
