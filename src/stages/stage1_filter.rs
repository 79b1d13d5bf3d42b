use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::stage0_segment::segment_transcript;
use crate::models::{Message, MessageBatch};

/// Configuration for the message filter
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Substrings that mark administrative messages
    pub admin_markers: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            admin_markers: vec![
                "Messages and calls are end-to-end encrypted".to_string(),
                "created group".to_string(),
                "created this group".to_string(),
                "joined using this group's invite link".to_string(),
                "joined from the community".to_string(),
                "now an admin".to_string(),
                "requested to join".to_string(),
            ],
        }
    }
}

impl FilterConfig {
    /// Whether the message is an administrative notice
    pub fn is_admin_notice(&self, message: &Message) -> bool {
        self.admin_markers
            .iter()
            .any(|marker| message.raw_text.contains(marker.as_str()))
    }
}

/// Keep messages strictly after the watermark that are not administrative
/// notices, preserving order
pub fn filter_messages(
    messages: Vec<Message>,
    watermark: NaiveDateTime,
    config: &FilterConfig,
) -> Vec<Message> {
    let before = messages.len();

    let kept: Vec<Message> = messages
        .into_iter()
        .filter(|m| m.timestamp > watermark)
        .filter(|m| !config.is_admin_notice(m))
        .collect();

    debug!(
        "Filter: kept {} of {} messages (watermark {})",
        kept.len(),
        before,
        watermark
    );
    kept
}

/// Segment, filter and take at most `batch_size` messages.
///
/// Filtering happens before the cut so the batch size counts only messages
/// that will actually be processed. The cut is pushed past any messages that
/// share the last scheduled timestamp. A transcript with no timestamped
/// messages at all is rejected.
pub fn select_batch(
    transcript: &str,
    watermark: NaiveDateTime,
    config: &FilterConfig,
    batch_size: usize,
) -> Result<MessageBatch> {
    let segmented = segment_transcript(transcript);
    let total_segmented = segmented.len();
    if total_segmented == 0 {
        bail!("Transcript contains no messages; expected lines starting with \"M/D/YY, H:MM AM -\"");
    }

    let mut eligible = filter_messages(segmented, watermark, config);
    let total_eligible = eligible.len();
    let mut deferred = eligible.split_off(batch_size.min(total_eligible));

    // Never cut inside a minute: the checkpoint could not move past it
    if let Some(boundary) = eligible.last().map(|m| m.timestamp) {
        let same_minute = deferred
            .iter()
            .take_while(|m| m.timestamp == boundary)
            .count();
        eligible.extend(deferred.drain(..same_minute));
    }
    let next_deferred = deferred.iter().map(|m| m.timestamp).min();

    info!(
        "Segmented {} messages, {} eligible after {}, {} scheduled",
        total_segmented,
        total_eligible,
        watermark,
        eligible.len()
    );

    Ok(MessageBatch {
        messages: eligible,
        total_segmented,
        total_eligible,
        next_deferred,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn watermark() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn msg(offset_minutes: i64, text: &str) -> Message {
        Message::new(watermark() + Duration::minutes(offset_minutes), text)
    }

    #[test]
    fn test_watermark_boundary() {
        let messages = vec![msg(0, "at watermark"), msg(1, "one minute after")];
        let kept = filter_messages(messages, watermark(), &FilterConfig::default());

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].raw_text, "one minute after");
    }

    #[test]
    fn test_admin_notices_removed() {
        let messages = vec![
            msg(1, "8/1/24, 10:01 AM - Messages and calls are end-to-end encrypted."),
            msg(2, "8/1/24, 10:02 AM - Priya joined using this group's invite link"),
            msg(3, "8/1/24, 10:03 AM - TPO: PPO at BMC"),
            msg(4, "8/1/24, 10:04 AM - You're now an admin"),
            msg(5, "8/1/24, 10:05 AM - Rahul requested to join"),
        ];
        let kept = filter_messages(messages, watermark(), &FilterConfig::default());

        assert_eq!(kept.len(), 1);
        assert!(kept[0].raw_text.contains("PPO at BMC"));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let config = FilterConfig::default();
        let messages = vec![
            msg(-5, "old"),
            msg(1, "8/1/24, 10:01 AM - Ravi created group \"TE Placements\""),
            msg(2, "keep me"),
            msg(3, "and me"),
        ];

        let once = filter_messages(messages, watermark(), &config);
        let twice = filter_messages(once.clone(), watermark(), &config);

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_batch_size_applies_after_filtering() {
        let transcript = "8/1/24, 10:01 AM - Messages and calls are end-to-end encrypted.\n\
                          8/1/24, 10:02 AM - TPO: first\n\
                          8/1/24, 10:03 AM - TPO: second\n\
                          8/1/24, 10:04 AM - TPO: third";

        let batch = select_batch(transcript, watermark(), &FilterConfig::default(), 2).unwrap();

        assert_eq!(batch.total_segmented, 4);
        assert_eq!(batch.total_eligible, 3);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.deferred(), 1);
        assert_eq!(batch.messages[0].body(), "TPO: first");
        assert_eq!(batch.next_deferred, Some(watermark() + Duration::minutes(4)));
    }

    #[test]
    fn test_batch_cut_extends_through_minute() {
        let transcript = "8/1/24, 10:02 AM - TPO: first\n\
                          8/1/24, 10:02 AM - TPO: second\n\
                          8/1/24, 10:02 AM - TPO: third\n\
                          8/1/24, 10:03 AM - TPO: fourth";

        let batch = select_batch(transcript, watermark(), &FilterConfig::default(), 1).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.deferred(), 1);
        assert_eq!(batch.next_deferred, Some(watermark() + Duration::minutes(3)));
    }

    #[test]
    fn test_transcript_without_messages_is_rejected() {
        let err = select_batch(
            "name,company\nAarav Shah,BMC\n",
            watermark(),
            &FilterConfig::default(),
            20,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no messages"));
    }

    #[test]
    fn test_all_messages_before_watermark_is_not_an_error() {
        let batch = select_batch(
            "8/1/24, 9:00 AM - TPO: old news",
            watermark(),
            &FilterConfig::default(),
            20,
        )
        .unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.next_deferred, None);
    }
}
