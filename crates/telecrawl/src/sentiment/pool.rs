//! Parallel scoring across blocking worker threads.

use std::sync::Arc;

use futures::future::join_all;

use super::scores::{SentimentScorer, SentimentScores};

/// Score `texts` on up to `workers` blocking threads.
///
/// Results come back in input order. A chunk whose worker panicked is
/// rescored on the calling task.
pub async fn score_parallel(
    scorer: Arc<dyn SentimentScorer>,
    texts: Vec<String>,
    workers: usize,
) -> Vec<SentimentScores> {
    if texts.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, texts.len());
    let chunk_size = texts.len().div_ceil(workers);
    let texts: Arc<Vec<String>> = Arc::new(texts);

    let ranges: Vec<(usize, usize)> = (0..texts.len())
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(texts.len())))
        .collect();

    let handles = ranges.iter().map(|&(start, end)| {
        let scorer = Arc::clone(&scorer);
        let texts = Arc::clone(&texts);
        tokio::task::spawn_blocking(move || {
            texts[start..end]
                .iter()
                .map(|text| scorer.score(text))
                .collect::<Vec<_>>()
        })
    });

    let mut scores = Vec::with_capacity(texts.len());
    for (result, &(start, end)) in join_all(handles).await.into_iter().zip(&ranges) {
        match result {
            Ok(chunk) => scores.extend(chunk),
            Err(e) => {
                tracing::error!(error = %e, start, end, "Scoring worker failed, rescoring inline");
                scores.extend(texts[start..end].iter().map(|text| scorer.score(text)));
            }
        }
    }

    tracing::debug!(count = scores.len(), workers = ranges.len(), "Scored batch");
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::LexiconScorer;

    /// Encodes the text length so ordering is observable.
    struct LengthScorer;

    impl SentimentScorer for LengthScorer {
        fn score(&self, text: &str) -> SentimentScores {
            SentimentScores {
                compound: text.len() as f64,
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn test_preserves_input_order() {
        let texts: Vec<String> = (1..=23).map(|n| "x".repeat(n)).collect();

        let scores = score_parallel(Arc::new(LengthScorer), texts, 4).await;

        let lengths: Vec<f64> = scores.iter().map(|s| s.compound).collect();
        let expected: Vec<f64> = (1..=23).map(f64::from).collect();
        assert_eq!(lengths, expected);
    }

    #[tokio::test]
    async fn test_empty_and_oversized_pool() {
        assert!(score_parallel(Arc::new(LengthScorer), Vec::new(), 8)
            .await
            .is_empty());

        let scores = score_parallel(Arc::new(LengthScorer), vec!["abc".to_string()], 64).await;
        assert_eq!(scores.len(), 1);
    }

    #[tokio::test]
    async fn test_matches_sequential_scoring() {
        let scorer = LexiconScorer::new();
        let texts = vec![
            "A zero-day exploit was used to compromise the server".to_string(),
            "After implementing multi-factor authentication, the system is way more secure"
                .to_string(),
            "The phishing attack failed due to user awareness training.".to_string(),
        ];
        let sequential: Vec<_> = texts.iter().map(|t| scorer.score(t)).collect();

        let parallel = score_parallel(Arc::new(scorer), texts, 2).await;
        assert_eq!(parallel, sequential);
    }
}
