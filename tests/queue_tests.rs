// Integration tests for the bounded frame queue
//
// These tests verify that the queue never exceeds its capacity and that a full
// queue holds the producer back instead of dropping frames.

use anyhow::Result;
use live_transcriber::pipeline::bounded;
use live_transcriber::{AudioEncoding, AudioFrame};
use std::time::Duration;
use tokio::time::timeout;

fn frame(sequence: u64) -> AudioFrame {
    AudioFrame::from_samples(&[sequence as i16; 4], AudioEncoding::mono(16000), sequence)
}

#[tokio::test]
async fn test_full_queue_suspends_producer_until_pop() -> Result<()> {
    let (producer, mut consumer) = bounded(2);

    producer.push(frame(0)).await?;
    producer.push(frame(1)).await?;
    assert_eq!(producer.len(), 2);

    // The sender is paused: nobody pops, so the third push must wait
    let pusher = tokio::spawn(async move {
        producer.push(frame(2)).await.map(|_| producer)
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pusher.is_finished(), "third push should be suspended");

    let first = consumer.pop().await.expect("queued frame");
    assert_eq!(first.sequence(), 0);

    let producer = timeout(Duration::from_secs(1), pusher).await???;
    assert_eq!(producer.len(), 2, "capacity is never exceeded");

    let rest: Vec<u64> = vec![
        consumer.pop().await.expect("frame 1").sequence(),
        consumer.pop().await.expect("frame 2").sequence(),
    ];
    assert_eq!(rest, vec![1, 2]);

    Ok(())
}

#[tokio::test]
async fn test_queue_never_exceeds_capacity() -> Result<()> {
    let (producer, mut consumer) = bounded(3);

    let pusher = tokio::spawn(async move {
        let mut max_len = 0;
        for seq in 0..20 {
            if producer.push(frame(seq)).await.is_err() {
                break;
            }
            max_len = max_len.max(producer.len());
        }
        max_len
    });

    let mut received = Vec::new();
    while let Some(frame) = consumer.pop().await {
        received.push(frame.sequence());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let max_len = pusher.await?;
    assert!(max_len <= 3, "queue held {} frames", max_len);
    assert_eq!(received, (0..20).collect::<Vec<_>>());

    Ok(())
}

#[tokio::test]
async fn test_try_pop_on_empty_queue() {
    let (producer, mut consumer) = bounded::<AudioFrame>(2);
    assert!(consumer.try_pop().is_none());
    assert!(producer.is_empty());
}
