use serde::{Deserialize, Serialize};

/// Tone applied to generated replies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReplyType {
    #[default]
    Professional,
    ShortAndSmart,
    Friendly,
    Urgent,
}

impl ReplyType {
    /// Product-facing label, as shown on the personality picker.
    pub fn label(&self) -> &'static str {
        match self {
            ReplyType::Professional => "Professional",
            ReplyType::ShortAndSmart => "Short & Smart",
            ReplyType::Friendly => "Friendly",
            ReplyType::Urgent => "Urgent",
        }
    }

    /// Tone directive embedded in the system instruction.
    pub fn tone_instruction(&self) -> &'static str {
        match self {
            ReplyType::Professional => {
                "Professional, friendly, and respectful. Short and easy to understand. Not robotic."
            }
            ReplyType::ShortAndSmart => {
                "Very short and smart. One or two sentences, no filler, straight to the point."
            }
            ReplyType::Friendly => {
                "Warm and friendly, like a helpful colleague. Casual but still polite."
            }
            ReplyType::Urgent => {
                "Direct and urgent. Make clear the message is prioritized and will be handled quickly."
            }
        }
    }
}

impl std::fmt::Display for ReplyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ReplyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(ReplyType::Professional),
            "short & smart" | "short-and-smart" | "shortandsmart" => Ok(ReplyType::ShortAndSmart),
            "friendly" => Ok(ReplyType::Friendly),
            "urgent" => Ok(ReplyType::Urgent),
            other => Err(format!("unknown reply type: {other}")),
        }
    }
}

/// Immutable snapshot of the business profile fed into each generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Business name embedded in every reply.
    pub company_name: String,
    /// Free-form working hours string, e.g. "9:00 AM to 5:00 PM".
    pub working_hours: String,
    /// Free-form working days string, e.g. "Monday to Friday".
    pub working_days: String,
    /// Business context the model can draw on when answering questions.
    pub context: String,
    /// Tone of the generated replies.
    pub reply_type: ReplyType,
    /// Ask the model to close with a contact-info line.
    pub include_contact_info: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            company_name: "Acme Business Solutions".into(),
            working_hours: "9:00 AM to 5:00 PM".into(),
            working_days: "Monday to Friday".into(),
            context: "We are a creative agency specialized in digital branding.".into(),
            reply_type: ReplyType::Professional,
            include_contact_info: false,
        }
    }
}

impl GeneratorConfig {
    /// Override the business name.
    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = name.into();
        self
    }

    /// Override the working hours string.
    pub fn with_working_hours(mut self, hours: impl Into<String>) -> Self {
        self.working_hours = hours.into();
        self
    }

    /// Override the working days string.
    pub fn with_working_days(mut self, days: impl Into<String>) -> Self {
        self.working_days = days.into();
        self
    }

    /// Override the business context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Override the reply tone.
    pub fn with_reply_type(mut self, reply_type: ReplyType) -> Self {
        self.reply_type = reply_type;
        self
    }

    /// Toggle the contact-info closing line.
    pub fn with_contact_info(mut self, include: bool) -> Self {
        self.include_contact_info = include;
        self
    }
}

/// Credentials for the hosted WhatsApp Cloud integration.
///
/// Held for a future integration; nothing in this crate places a call with
/// these values.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CloudConfig {
    pub access_token: String,
    pub phone_number_id: String,
    pub waba_id: String,
    pub is_enabled: bool,
}
