//! Static mode → system-prompt catalog (spec.md §4.6), modeled on the
//! teacher's static-registry tables (`pool::registry`'s model catalog).

use gateway_core::{Mode, TargetLang};

const LANGUAGE_ALIGNMENT: &str = "JSON keys must always be in English snake_case. Values must match the source language unless target_lang is specified. If target_lang=zh, translate all extracted values to Chinese.";

const CORE_PROMPT: &str = "You are a structured data extractor. Read the caller's instruction and input, then emit exactly one JSON object and nothing else (no markdown fencing). Required fields: schema_version (non-empty string), extracted (object), confidence (number between 0 and 1). Keys are always English snake_case.";

const ECOM_PROMPT: &str = "You are an e-commerce listing extractor. Emit exactly one JSON object and nothing else (no markdown fencing). Required fields: title (string), price (number or numeric string), currency (string, ISO-4217-like), spec (object of attributes), skus (array), bullet_points (array of strings). Keys are always English snake_case.";

const NEWS_PROMPT: &str = "You are a news article extractor. Emit exactly one JSON object and nothing else (no markdown fencing). Required fields: title (string), author (string or null, key must be present), published_at (string or null, key must be present), summary (string), viewpoints (array), entities (array). Keys are always English snake_case.";

const SOCIAL_PROMPT: &str = "You are a social-media post analyzer. Emit exactly one JSON object and nothing else (no markdown fencing). Required fields: sentiment (string), core_demand (string), brands (array), purchase_intent (boolean, key must be present), purchase_intent_reason (non-empty string). Keys are always English snake_case.";

const AUTO_PROMPT: &str = "You are a general-purpose structured data extractor. Decide the most fitting content type yourself. Emit exactly one JSON object and nothing else (no markdown fencing). Required fields: schema_version (non-empty string), type (snake_case identifier matching ^[a-z0-9_]+$), data (object), confidence (number between 0 and 1). Keys are always English snake_case.";

/// Returns the base system prompt for a mode that performs an upstream
/// call. `Mode::Json`/`Query`/`Kv`/`Csv` have no upstream prompt and are
/// not represented here — they are handled entirely by
/// `gateway-parsers`.
pub fn base_prompt(mode: Mode) -> &'static str {
    match mode {
        Mode::Ecom => ECOM_PROMPT,
        Mode::News => NEWS_PROMPT,
        Mode::Social => SOCIAL_PROMPT,
        Mode::Auto => AUTO_PROMPT,
        Mode::Deepseek | Mode::Json | Mode::Query | Mode::Kv | Mode::Csv => CORE_PROMPT,
    }
}

/// Builds the effective instruction sent as the user-turn prompt prelude
/// (spec.md §4.6): the canonical language-alignment sentence is prepended
/// to every instruction unless already present.
pub fn with_language_alignment(instruction: &str, target_lang: Option<TargetLang>) -> String {
    let mut out = String::new();
    if !instruction.contains(LANGUAGE_ALIGNMENT) {
        out.push_str(LANGUAGE_ALIGNMENT);
        out.push('\n');
    }
    if let Some(lang) = target_lang {
        out.push_str(&format!("target_lang={}\n", lang.as_str()));
    }
    out.push_str(instruction);
    out
}

/// Effective instruction per spec.md §4.10: the mode-forced prompt
/// overrides any caller-supplied instruction for ecom/news/social/auto;
/// for deepseek, caller instruction wins if non-empty, otherwise the
/// default core prompt is used.
pub fn effective_instruction(mode: Mode, caller_instruction: &str) -> String {
    match mode {
        Mode::Ecom | Mode::News | Mode::Social | Mode::Auto => base_prompt(mode).to_string(),
        Mode::Deepseek => {
            if caller_instruction.trim().is_empty() {
                CORE_PROMPT.to_string()
            } else {
                caller_instruction.to_string()
            }
        }
        Mode::Json | Mode::Query | Mode::Kv | Mode::Csv => CORE_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_alignment_is_prepended_once() {
        let out = with_language_alignment("extract the price", None);
        assert!(out.starts_with("JSON keys must always be in English snake_case"));
        assert!(out.contains("extract the price"));
    }

    #[test]
    fn language_alignment_not_duplicated_if_present() {
        let already = format!("{LANGUAGE_ALIGNMENT}\nextra instruction");
        let out = with_language_alignment(&already, None);
        assert_eq!(out.matches("JSON keys must always be in English snake_case").count(), 1);
    }

    #[test]
    fn target_lang_is_included_when_set() {
        let out = with_language_alignment("x", Some(TargetLang::Zh));
        assert!(out.contains("target_lang=zh"));
    }

    #[test]
    fn effective_instruction_overrides_for_ecom() {
        let out = effective_instruction(Mode::Ecom, "ignored by mode override");
        assert_eq!(out, ECOM_PROMPT);
    }

    #[test]
    fn deepseek_uses_caller_instruction_when_present() {
        let out = effective_instruction(Mode::Deepseek, "custom instruction");
        assert_eq!(out, "custom instruction");
    }

    #[test]
    fn deepseek_falls_back_to_core_prompt_when_empty() {
        let out = effective_instruction(Mode::Deepseek, "   ");
        assert_eq!(out, CORE_PROMPT);
    }
}
