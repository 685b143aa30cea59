//! Result aggregation
//!
//! Folds ordered page outcomes into a [`DocumentResult`]. Pure: the same
//! outcome sequence always produces an identical result.

use crate::ocr::PageOutcome;

use super::result::DocumentResult;

/// Separator placed between consecutive pages in the concatenated text
pub const PAGE_BREAK: &str = "\n\n--- page break ---\n\n";

/// Text standing in for a page that failed (1-based page number)
pub fn failed_page_placeholder(index: usize) -> String {
    format!("[page {}: text unavailable]", index + 1)
}

/// Merge outcomes (already in page order) into the final document result
pub fn aggregate(outcomes: Vec<PageOutcome>) -> DocumentResult {
    debug_assert!(
        outcomes.windows(2).all(|w| w[0].index() < w[1].index()),
        "outcomes must be in page order"
    );

    let mut text = String::new();
    let mut failed_pages = Vec::new();
    let mut confidence_sum = 0.0;
    let mut recognized = 0usize;

    for (position, outcome) in outcomes.iter().enumerate() {
        if position > 0 {
            text.push_str(PAGE_BREAK);
        }
        match outcome {
            PageOutcome::Recognized {
                text: page_text,
                confidence,
                ..
            } => {
                text.push_str(page_text);
                confidence_sum += confidence;
                recognized += 1;
            }
            PageOutcome::Failed { index, .. } => {
                text.push_str(&failed_page_placeholder(*index));
                failed_pages.push(*index);
            }
        }
    }

    failed_pages.sort_unstable();

    // No recognized pages means no data, which is not the same as zero
    let average_confidence = if recognized > 0 {
        Some(confidence_sum / recognized as f64)
    } else {
        None
    };

    DocumentResult {
        text,
        success: failed_pages.is_empty(),
        page_count: outcomes.len(),
        failed_pages,
        average_confidence,
        pages: outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{FailureReason, TextSource};
    use std::time::Duration;

    fn recognized(index: usize, text: &str, confidence: f64) -> PageOutcome {
        PageOutcome::Recognized {
            index,
            text: text.to_string(),
            confidence,
            elapsed: Duration::from_millis(10),
            source: TextSource::Ocr,
            attempts: 1,
            words: vec![],
        }
    }

    fn failed(index: usize) -> PageOutcome {
        PageOutcome::Failed {
            index,
            reason: FailureReason::EngineError {
                message: "boom".into(),
            },
            attempts: 1,
        }
    }

    #[test]
    fn test_concatenates_in_page_order_with_breaks() {
        let result = aggregate(vec![
            recognized(0, "first", 0.9),
            recognized(1, "second", 0.7),
        ]);

        assert_eq!(result.text, format!("first{}second", PAGE_BREAK));
        assert!(result.success);
        assert_eq!(result.page_count, 2);
        assert!(result.failed_pages.is_empty());
        assert!((result.average_confidence.unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_failed_page_gets_placeholder_between_neighbors() {
        let result = aggregate(vec![
            recognized(0, "a", 0.6),
            failed(1),
            recognized(2, "c", 0.8),
            failed(3),
        ]);

        assert_eq!(
            result.text,
            format!(
                "a{b}{p1}{b}c{b}{p3}",
                b = PAGE_BREAK,
                p1 = failed_page_placeholder(1),
                p3 = failed_page_placeholder(3)
            )
        );
        assert!(!result.success);
        assert_eq!(result.failed_pages, vec![1, 3]);
        assert_eq!(result.recognized_count(), 2);
        // Failed pages do not drag the average down
        assert!((result.average_confidence.unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_all_failed_has_no_average() {
        let result = aggregate(vec![failed(0), failed(1)]);
        assert_eq!(result.average_confidence, None);
        assert!(!result.success);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("averageConfidence").is_none());
    }

    #[test]
    fn test_all_blank_pages_succeed_with_low_confidence() {
        let result = aggregate(vec![
            recognized(0, "", 0.0),
            recognized(1, "", 0.02),
            recognized(2, "", 0.0),
        ]);

        assert!(result.success);
        assert_eq!(result.text, format!("{b}{b}", b = PAGE_BREAK));
        let avg = result.average_confidence.expect("average is defined");
        assert!(avg < 0.05);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let outcomes = vec![recognized(0, "x", 0.5), failed(1), recognized(2, "z", 0.25)];

        let first = aggregate(outcomes.clone());
        let second = aggregate(outcomes);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_empty_outcomes() {
        let result = aggregate(vec![]);
        assert_eq!(result.text, "");
        assert_eq!(result.page_count, 0);
        assert!(result.success);
        assert_eq!(result.average_confidence, None);
    }
}
