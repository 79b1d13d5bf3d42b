use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single transcript message, anchored at its timestamp prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Parsed prefix timestamp (local clock, no timezone)
    pub timestamp: NaiveDateTime,
    /// Message text, starting at the timestamp prefix
    pub raw_text: String,
}

impl Message {
    pub fn new(timestamp: NaiveDateTime, raw_text: impl Into<String>) -> Self {
        Self {
            timestamp,
            raw_text: raw_text.into(),
        }
    }

    /// Text after the `timestamp -` prefix
    pub fn body(&self) -> &str {
        self.raw_text
            .split_once(" -")
            .map(|(_, body)| body.trim_start())
            .unwrap_or(&self.raw_text)
    }
}

/// Messages selected for one processing batch
#[derive(Debug, Clone, Default)]
pub struct MessageBatch {
    /// Messages to process, in transcript order
    pub messages: Vec<Message>,
    /// Messages produced by segmentation
    pub total_segmented: usize,
    /// Messages that survived the watermark and notice filter
    pub total_eligible: usize,
    /// Earliest timestamp among eligible messages cut from this batch
    pub next_deferred: Option<NaiveDateTime>,
}

impl MessageBatch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Eligible messages left for a later run
    pub fn deferred(&self) -> usize {
        self.total_eligible.saturating_sub(self.messages.len())
    }

    /// Watermark that is safe to save once `messages[..=index]` are processed.
    ///
    /// Timestamps only carry minute precision, so a later message can share
    /// the processed message's timestamp. The result always stays strictly
    /// below every message not yet processed.
    pub fn checkpoint_after(&self, index: usize) -> Option<NaiveDateTime> {
        let done = self.messages.get(index)?.timestamp;
        let pending = self.messages[index + 1..]
            .iter()
            .map(|m| m.timestamp)
            .chain(self.next_deferred)
            .min();

        match pending {
            Some(next) if next <= done => next.checked_sub_signed(Duration::seconds(1)),
            _ => Some(done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_body_strips_prefix() {
        let msg = Message::new(ts(), "8/1/24, 10:15 AM - TPO: PPO at BMC");
        assert_eq!(msg.body(), "TPO: PPO at BMC");
    }

    #[test]
    fn test_batch_deferred() {
        let batch = MessageBatch {
            messages: vec![Message::new(ts(), "x")],
            total_segmented: 5,
            total_eligible: 3,
            next_deferred: None,
        };
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert_eq!(batch.deferred(), 2);
    }

    #[test]
    fn test_checkpoint_stays_below_same_minute_messages() {
        let later = ts() + Duration::minutes(5);
        let batch = MessageBatch {
            messages: vec![
                Message::new(ts(), "a"),
                Message::new(ts(), "b"),
                Message::new(later, "c"),
            ],
            total_segmented: 4,
            total_eligible: 4,
            next_deferred: Some(later),
        };

        assert_eq!(batch.checkpoint_after(0), Some(ts() - Duration::seconds(1)));
        assert_eq!(batch.checkpoint_after(1), Some(ts()));
        assert_eq!(batch.checkpoint_after(2), Some(later - Duration::seconds(1)));
        assert_eq!(batch.checkpoint_after(3), None);
    }

    #[test]
    fn test_checkpoint_at_end_of_batch() {
        let batch = MessageBatch {
            messages: vec![Message::new(ts(), "a")],
            total_segmented: 1,
            total_eligible: 1,
            next_deferred: None,
        };
        assert_eq!(batch.checkpoint_after(0), Some(ts()));
    }
}
