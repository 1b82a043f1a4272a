//! End-to-end streaming scenarios over the public API, using the scripted
//! transport in place of a live backend.

use mallama::backend::mock::{MockScript, MockTransport};
use mallama::core::{
    ChatError, FrameDecoder, GenerationParams, GenerationSession, Role, SessionOutcome,
    StreamEvent, Transcript,
};

fn params() -> GenerationParams {
    GenerationParams {
        model: "llama3".to_string(),
        ..GenerationParams::default()
    }
}

#[tokio::test]
async fn multi_turn_conversation_accumulates_context() {
    let transport = MockTransport::new()
        .with_script(MockScript::chunks(vec![
            "data: {\"token\":\"four\"}\n\ndata: [DONE]\n\n",
        ]))
        .with_script(MockScript::chunks(vec![
            "data: {\"token\":\"six\"}\n\ndata: [DONE]\n\n",
        ]));
    let mut transcript = Transcript::new();

    let first = GenerationSession::new(params()).unwrap();
    first
        .run(&transport, &mut transcript, "what is 2+2?")
        .await
        .unwrap();

    let second = GenerationSession::new(params()).unwrap();
    second
        .run(&transport, &mut transcript, "and plus two more?")
        .await
        .unwrap();

    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript.messages()[1].content, "four");
    assert_eq!(transcript.messages()[3].content, "six");

    // The second request carries the whole first exchange.
    let requests = transport.requests();
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[0].content, "what is 2+2?");
    assert_eq!(requests[1].messages[1].content, "four");
    assert_eq!(requests[1].messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn failed_turn_leaves_transcript_usable_for_retry() {
    let transport = MockTransport::new()
        .with_script(MockScript::chunks(vec!["data: ERROR: model crashed\n\n"]))
        .with_script(MockScript::chunks(vec![
            "data: {\"token\":\"recovered\"}\n\ndata: [DONE]\n\n",
        ]));
    let mut transcript = Transcript::new();

    let failing = GenerationSession::new(params()).unwrap();
    let err = failing
        .run(&transport, &mut transcript, "first try")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Stream(_)));

    // The failed turn left only the user message behind.
    assert_eq!(transcript.len(), 1);
    assert!(transcript.in_flight().is_none());

    let retry = GenerationSession::new(params()).unwrap();
    let outcome = retry
        .run(&transport, &mut transcript, "second try")
        .await
        .unwrap();

    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.messages()[2].content, "recovered");
}

#[tokio::test]
async fn thinking_and_tokens_interleave_correctly() {
    let transport = MockTransport::new().with_script(MockScript::chunks(vec![
        "data: {\"thinking\":\"step one\"}\n\n",
        "data: {\"thinking\":\" step two\",\"token\":\"The answer\"}\n\n",
        "data: {\"token\":\" is 42\"}\n\ndata: [DONE]\n\n",
    ]));
    let mut transcript = Transcript::new();

    let session = GenerationSession::new(params()).unwrap();
    session
        .run(&transport, &mut transcript, "think hard")
        .await
        .unwrap();

    let reply = &transcript.messages()[1];
    assert_eq!(reply.thinking.as_deref(), Some("step one step two"));
    assert_eq!(reply.content, "The answer is 42");
}

#[tokio::test]
async fn byte_chunking_never_changes_the_result() {
    let full = "data: {\"thinking\":\"hm\"}\n\ndata: {\"token\":\"héllo \"}\n\n\
                data: {\"token\":\"wörld\"}\n\ndata: [DONE]\n\n";
    let bytes = full.as_bytes();

    let mut reference = FrameDecoder::new();
    let reference_events = reference.push(full);

    // Split the stream at every byte offset, including inside UTF-8
    // sequences and frame delimiters.
    for split in 1..bytes.len() {
        let mut decoder = FrameDecoder::new();
        let mut events = decoder.push_bytes(&bytes[..split]);
        events.extend(decoder.push_bytes(&bytes[split..]));

        assert_eq!(events, reference_events, "split at byte {split}");
    }
}

#[tokio::test]
async fn noise_between_frames_is_ignored() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.push(
        ": keepalive\n\ndata: {\"token\":\"ok\"}\n\n\n\ndata: [DONE]\n\n",
    );

    assert_eq!(
        events,
        vec![
            StreamEvent::Response("ok".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn frames_after_done_are_dropped() {
    let mut decoder = FrameDecoder::new();
    let events =
        decoder.push("data: [DONE]\n\ndata: {\"token\":\"stale\"}\n\n");
    assert_eq!(events, vec![StreamEvent::Done]);

    let more = decoder.push("data: {\"token\":\"later\"}\n\n");
    assert!(more.is_empty());
}

#[tokio::test]
async fn cancel_then_new_session_reuses_transcript() {
    let transport = MockTransport::new()
        .with_script(MockScript::chunks_then_pending(vec![
            "data: {\"token\":\"partial answer\"}\n\n",
        ]))
        .with_script(MockScript::chunks(vec![
            "data: {\"token\":\"full answer\"}\n\ndata: [DONE]\n\n",
        ]));
    let mut transcript = Transcript::new();

    let session = GenerationSession::new(params()).unwrap();
    let handle = session.cancel_handle();

    let outcome = {
        let run = session.run(&transport, &mut transcript, "slow question");
        tokio::pin!(run);

        for _ in 0..3 {
            tokio::select! {
                biased;
                _ = &mut run => panic!("pending stream should not finish"),
                () = tokio::task::yield_now() => {}
            }
        }
        handle.cancel();
        run.await.unwrap()
    };

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert_eq!(transcript.messages()[1].content, "partial answer");
    assert!(transcript.in_flight().is_none());
    assert_eq!(transport.stop_calls(), 1);

    // The partial turn stays in context for the next session.
    let next = GenerationSession::new(params()).unwrap();
    next.run(&transport, &mut transcript, "try again")
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[1].messages[1].content, "partial answer");
}
