//! Prompt templates for copy generation
//!
//! Two fixed templates: a support/outro message for reader-support
//! categories and a promotional template for everything else.

use super::request::{GenerationRequest, LengthCategory, OfferType, Tone};

/// The user turn sent with every generation call
pub const USER_PROMPT: &str = "Generate the promotional text variations now.";

/// Tone guidance line for the promotional template
pub fn tone_guidance(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => {
            "Professional, authoritative, trust-building. Use industry terminology appropriately."
        }
        Tone::Casual => {
            "Friendly, conversational, approachable. Like talking to a colleague over coffee."
        }
        Tone::Urgent => {
            "Time-sensitive, action-oriented, creates FOMO. Emphasize limited availability."
        }
        Tone::Friendly => "Warm, personal, helpful. Focus on benefits to the reader.",
        Tone::Exciting => "Energetic, enthusiastic, inspiring. Use powerful action words.",
    }
}

/// Length guidance line shared by both templates
pub fn length_guidance(length: LengthCategory) -> &'static str {
    match length {
        LengthCategory::Short => {
            "Keep it concise (1-2 sentences, ~30-50 words). Perfect for busy readers."
        }
        LengthCategory::Medium => {
            "Moderate length (3-4 sentences, ~60-80 words). Enough detail to convince."
        }
        LengthCategory::Long => {
            "Detailed explanation (5-6 sentences, ~100-120 words). Thorough value proposition."
        }
    }
}

/// Build the system prompt for `request`
pub fn system_prompt(request: &GenerationRequest, publication: &str) -> String {
    match request.category {
        OfferType::Donation => support_prompt(request, publication),
        OfferType::Affiliate | OfferType::Review => promotional_prompt(request, publication),
    }
}

fn support_prompt(request: &GenerationRequest, publication: &str) -> String {
    let count = request.variation_count;
    format!(
        r#"You are an expert newsletter copywriter for {publication}.

Your task: Generate {count} distinct variations for our reader support outro message.

Offer: {name}
Description: {description}

Context: This appears at the END of the newsletter as a friendly "support us" message.

Requirements:
- Tone: Warm, friendly, slightly humorous - NOT salesy
- Length: {length}
- Make it feel like a genuine "thanks for reading" note
- NO headline needed (it's in the outro section)
- Focus on community support, not hard sell
- Each variation should have a unique angle or humor

Format your response as JSON array:
[
  {{
    "text": "Outro message text here...",
    "cta": "Buy Me a Coffee"
  }},
  ...
]

Generate exactly {count} variations."#,
        publication = publication,
        count = count,
        name = request.subject_name,
        description = request.subject_description,
        length = length_guidance(request.length),
    )
}

fn promotional_prompt(request: &GenerationRequest, publication: &str) -> String {
    let count = request.variation_count;
    format!(
        r#"You are an expert newsletter copywriter specializing in promotional content for {publication}.

Your task: Generate {count} distinct promotional variations for this offer:

Offer: {name}
Description: {description}
Link: {destination}
Type: {category}

Requirements:
- Tone: {tone}
- Length: {length}
- Each variation must include:
  1. HEADLINE: Attention-grabbing (5-10 words, bold-worthy)
  2. TEXT: Compelling promotional copy
  3. CTA: Clear call-to-action button text (2-4 words)
- Focus on benefits, not just features
- Make it newsletter-friendly (easy to scan, spam-filter safe)
- Headlines should create curiosity or highlight value
- Each variation should be significantly different from the others

Format your response as JSON array:
[
  {{
    "headline": "Your Attention-Grabbing Headline Here",
    "text": "Promotional text goes here...",
    "cta": "Get Started"
  }},
  ...
]

Generate exactly {count} variations."#,
        publication = publication,
        count = count,
        name = request.subject_name,
        description = request.subject_description,
        destination = request.destination,
        category = request.category,
        tone = tone_guidance(request.tone),
        length = length_guidance(request.length),
    )
}
