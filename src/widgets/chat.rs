//! Chat widget: canned replies picked by keyword, after a fake "thinking" pause.
//!
//! There is no model behind this. A message is lowercased and checked
//! against a short rule table; anything unmatched gets a random stock reply.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::WidgetTimings;

pub const GREETING: &str = "Hello! I'm your AI assistant from GSGROUPS. How can I help you with your digital transformation journey today?";

pub const QUICK_ACTIONS: &[&str] = &["AI Strategy", "ML Solutions", "Book Consultation", "View Portfolio"];

pub const PRICING_REPLY: &str = "Our pricing varies based on project scope and requirements. I'd recommend scheduling a consultation to discuss your specific needs and get a customized quote. Would you like me to set that up?";

pub const CAPABILITIES_REPLY: &str = "We specialize in cutting-edge AI solutions including machine learning, natural language processing, computer vision, and predictive analytics. What type of AI application are you interested in?";

pub const SCHEDULING_REPLY: &str = "I'd be happy to schedule a consultation with our AI experts! Our consultations cover strategy, implementation planning, and ROI analysis. Would you prefer a video call or phone consultation?";

pub const CASE_STUDIES_REPLY: &str = "We've successfully implemented AI solutions across various industries including healthcare, finance, e-commerce, and manufacturing. I can show you relevant case studies. What industry are you in?";

pub const FALLBACK_REPLIES: [&str; 7] = [
    GREETING,
    "I'd be happy to help you explore our AI and machine learning solutions. What specific challenges are you looking to solve?",
    "Our team specializes in custom AI implementations, cloud architecture, and digital strategy. Would you like to know more about any of these areas?",
    "That's a great question! Based on your needs, I can recommend the best approach for your AI implementation. Let me connect you with one of our specialists.",
    "I can help you understand the ROI of AI solutions for your business. Would you like to schedule a consultation to discuss your specific use case?",
    "Our AI solutions have helped companies increase efficiency by up to 40%. I'd love to show you some case studies relevant to your industry.",
    "For complex AI implementations, I recommend starting with a strategy session. Would you like me to schedule a consultation with our AI experts?",
];

struct KeywordRule {
    keywords: &'static [&'static str],
    reply: &'static str,
}

/// Checked in order; the first rule with any keyword in the message wins.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["price", "cost"],
        reply: PRICING_REPLY,
    },
    KeywordRule {
        keywords: &["ai", "artificial intelligence", "machine learning"],
        reply: CAPABILITIES_REPLY,
    },
    KeywordRule {
        keywords: &["consultation", "meeting"],
        reply: SCHEDULING_REPLY,
    },
    KeywordRule {
        keywords: &["portfolio", "examples"],
        reply: CASE_STUDIES_REPLY,
    },
];

/// Plain substring match, so "ai" also hits words like "email".
pub fn keyword_reply(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
        .map(|rule| rule.reply)
}

pub fn select_reply<R: Rng + ?Sized>(message: &str, rng: &mut R) -> &'static str {
    keyword_reply(message)
        .unwrap_or_else(|| FALLBACK_REPLIES[rng.random_range(0..FALLBACK_REPLIES.len())])
}

/// Uniform in `[min, min + jitter]`.
pub fn reply_delay<R: Rng + ?Sized>(timings: &WidgetTimings, rng: &mut R) -> Duration {
    let jitter_ms = timings.chat_delay_jitter.as_millis() as u64;
    let extra = if jitter_ms == 0 {
        0
    } else {
        rng.random_range(0..=jitter_ms)
    };
    timings.chat_delay_min + Duration::from_millis(extra)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn from_ai(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_price_or_cost_gets_pricing_reply() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(select_reply("What's the PRICE?", &mut rng), PRICING_REPLY);
        assert_eq!(select_reply("how much does it cost", &mut rng), PRICING_REPLY);
    }

    #[test]
    fn test_rules_apply_in_order() {
        // "cost" outranks "ai" and "meeting"
        assert_eq!(keyword_reply("AI meeting cost"), Some(PRICING_REPLY));
        assert_eq!(keyword_reply("Tell me about machine learning"), Some(CAPABILITIES_REPLY));
        assert_eq!(keyword_reply("book a meeting"), Some(SCHEDULING_REPLY));
        assert_eq!(keyword_reply("show me examples"), Some(CASE_STUDIES_REPLY));
    }

    #[test]
    fn test_ai_matches_as_substring() {
        assert_eq!(keyword_reply("my email is down"), Some(CAPABILITIES_REPLY));
    }

    #[test]
    fn test_unmatched_message_gets_a_fallback() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let reply = select_reply("hello there", &mut rng);
            assert!(FALLBACK_REPLIES.contains(&reply));
        }
    }

    #[test]
    fn test_reply_delay_stays_in_window() {
        let timings = WidgetTimings::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let delay = reply_delay(&timings, &mut rng);
            assert!(delay >= Duration::from_millis(1500));
            assert!(delay <= Duration::from_millis(2500));
        }
        assert_eq!(
            reply_delay(&WidgetTimings::instant(), &mut rng),
            Duration::ZERO
        );
    }

    #[test]
    fn test_ai_message_serializes_sender_lowercase() {
        let msg = ChatMessage::from_ai("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], "ai");
        assert_eq!(json["content"], "hi");
    }
}
