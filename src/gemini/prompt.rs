//! Prompt construction for the two generation flows.

use crate::config::GeneratorConfig;

/// Fixed model identifier used for every generation request.
pub const MODEL: &str = "gemini-3-flash-preview";

/// Temperature for the standing auto-reply template.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Temperature for dynamic replies to a specific customer message.
pub const DYNAMIC_TEMPERATURE: f32 = 0.85;

/// A single generation request: system instruction, one user content string,
/// and a sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_content: String,
    pub temperature: f32,
}

/// Build the request for the standing auto-reply template.
pub fn default_reply_request(config: &GeneratorConfig) -> GenerationRequest {
    let mut system_instruction = format!(
        "Act as a professional WhatsApp auto-reply assistant for \"{}\".\n\
         Generate a polite, clear, and professional auto-reply message for WhatsApp.\n\
         \n\
         STRUCTURE (MANDATORY):\n\
         1. A professional greeting.\n\
         2. Confirmation that the message has been received successfully.\n\
         3. Explicitly state working hours: {} ({}).\n\
         4. Clear assurance of a reply within those working hours.\n\
         \n\
         TONE: {}\n\
         CONTEXT: Sent automatically when outside working hours or team is busy. {}\n\
         OUTPUT: Only the WhatsApp message text. No placeholders like [Name].",
        config.company_name,
        config.working_hours,
        config.working_days,
        config.reply_type.tone_instruction(),
        config.context,
    );
    if config.include_contact_info {
        system_instruction.push_str(
            "\nClose with one short line inviting the customer to leave their contact details.",
        );
    }

    GenerationRequest {
        system_instruction,
        user_content: "Generate my professional WhatsApp auto-reply message.".into(),
        temperature: DEFAULT_TEMPERATURE,
    }
}

/// Build the request for a reply addressing a specific incoming message.
pub fn dynamic_reply_request(incoming: &str, config: &GeneratorConfig) -> GenerationRequest {
    let mut system_instruction = format!(
        "You are a professional assistant for \"{}\".\n\
         \n\
         Respond to this specific message: \"{}\"\n\
         \n\
         Follow this structure:\n\
         1. Professional greeting + confirmation of receipt.\n\
         2. Brief answer/acknowledgement of their specific question.\n\
         3. Mention we are currently away/busy.\n\
         4. State working hours: {} ({}).\n\
         5. Assurance of human follow-up.\n\
         \n\
         TONE: {}\n\
         BUSINESS CONTEXT: {}",
        config.company_name,
        incoming,
        config.working_hours,
        config.working_days,
        config.reply_type.tone_instruction(),
        config.context,
    );
    if config.include_contact_info {
        system_instruction.push_str(
            "\nClose with one short line inviting the customer to leave their contact details.",
        );
    }

    GenerationRequest {
        system_instruction,
        user_content: format!("Customer Message: \"{incoming}\""),
        temperature: DYNAMIC_TEMPERATURE,
    }
}
