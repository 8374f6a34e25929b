//! Request and result types for copy generation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Largest number of variations one call may ask for
pub const MAX_VARIATIONS: usize = 30;

/// Offer category, which also picks the prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    /// Affiliate link promotion
    Affiliate,

    /// Product review placement
    Review,

    /// Reader support message in the newsletter outro
    Donation,
}

impl OfferType {
    /// All categories, in declaration order
    pub const ALL: [OfferType; 3] = [OfferType::Affiliate, OfferType::Review, OfferType::Donation];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Affiliate => "affiliate",
            OfferType::Review => "review",
            OfferType::Donation => "donation",
        }
    }

    /// Whether generated items for this category carry a headline
    pub fn uses_headline(&self) -> bool {
        !matches!(self, OfferType::Donation)
    }
}

/// Writing tone for promotional copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Urgent,
    Friendly,
    Exciting,
}

impl Tone {
    /// All tones, in declaration order
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Urgent,
        Tone::Friendly,
        Tone::Exciting,
    ];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Urgent => "urgent",
            Tone::Friendly => "friendly",
            Tone::Exciting => "exciting",
        }
    }
}

/// Target length of each variation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthCategory {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthCategory {
    /// All length categories, in declaration order
    pub const ALL: [LengthCategory; 3] = [
        LengthCategory::Short,
        LengthCategory::Medium,
        LengthCategory::Long,
    ];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthCategory::Short => "short",
            LengthCategory::Medium => "medium",
            LengthCategory::Long => "long",
        }
    }
}

macro_rules! wire_name_impls {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ServiceError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim().to_lowercase();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = <$ty>::ALL.iter().map(|v| v.as_str()).collect();
                        ServiceError::validation(format!(
                            "Invalid {} '{}'. Must be one of: {}",
                            $label,
                            s,
                            allowed.join(", ")
                        ))
                    })
            }
        }
    };
}

wire_name_impls!(OfferType, "offer type");
wire_name_impls!(Tone, "tone");
wire_name_impls!(LengthCategory, "length category");

/// What to write copy for, and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Offer or sponsor name
    pub subject_name: String,

    /// What the offer is about
    pub subject_description: String,

    /// Where the reader is sent
    pub destination: String,

    /// Category, selects the prompt template
    pub category: OfferType,

    /// Writing tone
    #[serde(default)]
    pub tone: Tone,

    /// Target length
    #[serde(default)]
    pub length: LengthCategory,

    /// How many variations to ask for, 1 to 30
    pub variation_count: usize,
}

impl GenerationRequest {
    /// A request with default tone and length and a single variation
    pub fn new(
        subject_name: impl Into<String>,
        subject_description: impl Into<String>,
        destination: impl Into<String>,
        category: OfferType,
    ) -> Self {
        Self {
            subject_name: subject_name.into(),
            subject_description: subject_description.into(),
            destination: destination.into(),
            category,
            tone: Tone::default(),
            length: LengthCategory::default(),
            variation_count: 1,
        }
    }

    /// Set the tone
    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// Set the length category
    pub fn length(mut self, length: LengthCategory) -> Self {
        self.length = length;
        self
    }

    /// Set the number of variations
    pub fn variations(mut self, count: usize) -> Self {
        self.variation_count = count;
        self
    }

    /// Check field constraints without touching the network
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("subject_name", &self.subject_name),
            ("subject_description", &self.subject_description),
            ("destination", &self.destination),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ServiceError::validation(format!(
                    "{} is required and cannot be empty",
                    field
                )));
            }
        }

        if !(1..=MAX_VARIATIONS).contains(&self.variation_count) {
            return Err(ServiceError::validation(format!(
                "variation_count must be between 1 and {}, got {}",
                MAX_VARIATIONS, self.variation_count
            )));
        }

        Ok(())
    }
}

/// One generated unit of promotional copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Headline, absent for the support category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,

    /// Body text, never empty
    pub body: String,

    /// Call-to-action label
    pub cta: String,
}

/// Validated output of one generate call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Id used in logs for this call
    pub request_id: String,

    /// Generated items, at most the requested count
    pub items: Vec<ContentItem>,

    /// Number of variations that were asked for
    pub requested: usize,
}

impl GenerationResult {
    /// Whether the model returned fewer items than requested
    pub fn is_short(&self) -> bool {
        self.items.len() < self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GenerationRequest {
        GenerationRequest::new(
            "AI Tools Bundle",
            "Complete collection of productivity tools",
            "https://example.com/bundle",
            OfferType::Affiliate,
        )
        .tone(Tone::Exciting)
        .variations(5)
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("casual".parse::<Tone>().unwrap(), Tone::Casual);
        assert_eq!(" LONG ".parse::<LengthCategory>().unwrap(), LengthCategory::Long);
        assert_eq!("donation".parse::<OfferType>().unwrap(), OfferType::Donation);

        let err = "sarcastic".parse::<Tone>().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(err.to_string().contains("professional, casual, urgent, friendly, exciting"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Tone::default(), Tone::Professional);
        assert_eq!(LengthCategory::default(), LengthCategory::Medium);

        let request = GenerationRequest::new("a", "b", "c", OfferType::Review);
        assert_eq!(request.tone, Tone::Professional);
        assert_eq!(request.length, LengthCategory::Medium);
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["category"], "affiliate");
        assert_eq!(json["tone"], "exciting");
        assert_eq!(json["length"], "medium");

        let bad = r#"{"subject_name":"a","subject_description":"b","destination":"c","category":"affiliate","tone":"angry","variation_count":1}"#;
        assert!(serde_json::from_str::<GenerationRequest>(bad).is_err());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(sample().validate().is_ok());
        assert!(sample().variations(30).validate().is_ok());
        assert!(sample().variations(0).validate().is_err());
        assert!(sample().variations(31).validate().is_err());
    }

    #[test]
    fn test_validate_required_fields() {
        let mut request = sample();
        request.destination = "   ".to_string();
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn test_donation_has_no_headline() {
        assert!(!OfferType::Donation.uses_headline());
        assert!(OfferType::Review.uses_headline());
    }
}
