//! Role instructions and task templates for the analysis stages.
//!
//! Each stage sends two messages: a fixed role instruction (system) and a
//! task prompt built from the stage's declared inputs (user). Templates
//! carry the JSON shape the structured parser expects.

/// Role instruction for translation and language detection.
pub const LANGUAGE_ROLE: &str = "You are a helpful assistant.";

/// Role instruction for the Legal stage.
pub const LEGAL_ROLE: &str = "You are a strict legal assistant. Output JSON only.";

/// Role instruction for the Risk stage.
pub const RISK_ROLE: &str = "You are a cynical risk analyst. Output JSON only.";

/// Role instruction for the Ethics stage.
pub const ETHICS_ROLE: &str = "You are an ethical guardian. Prioritize safety.";

/// Role instruction for the Confidence stage.
pub const CONFIDENCE_ROLE: &str = "You are a strict evaluator. Be harsh.";

/// All stages generate at temperature 0.0.
pub const STAGE_TEMPERATURE: f32 = 0.0;

const LEGAL_TEMPLATE: &str = r#"You are a Legal Aid Agent for Indian Law.
User Situation: "{situation}"

Context from the legal databases:
{context}

Task:
1. Identify the most relevant statute sections.
2. Explain why they apply.
3. Suggest a legal course of action (e.g., File FIR).

Output Format:
{
    "sections": ["Section 378", ...],
    "reasoning": "...",
    "advice": "..."
}
Return ONLY valid JSON."#;

const RISK_TEMPLATE: &str = r#"You are the Risk Assessment Agent. You are PESSIMISTIC and CAUTIOUS.
User Situation: "{situation}"
Proposed Legal Advice (if any): "{legal}"

Task:
1. Identify potential risks for the user (physical, financial, social).
2. Identify risks of the legal advice (e.g., retaliation, lack of evidence).
3. Flag if the situation seems to be a trap or fake.

Output Format:
{
    "risks": ["Risk 1", "Risk 2"],
    "severity": "High/Medium/Low",
    "concerns": "..."
}
Return ONLY valid JSON."#;

const ETHICS_TEMPLATE: &str = r#"You are the Ethics & Safety Agent. You have VETO power.
User Situation: "{situation}"
Risk Analysis: "{risk}"

Task:
1. Evaluate if the request violates safety policies (Self-harm, Violence, Illegal acts, Hate speech).
2. Decide if the system should REFUSE to answer.
3. If refusing, provide a safe, neutral reason.

Output Format:
{
    "is_safe": true/false,
    "veto": true/false,
    "reason": "..."
}
Return ONLY valid JSON."#;

const CONFIDENCE_TEMPLATE: &str = r#"You are the Confidence Assessment Agent. You are SKEPTICAL.
User Situation: "{situation}"
Legal Advice: "{legal}"
Risk Analysis: "{risk}"

Task:
1. Evaluate if the user provided enough information.
2. Evaluate if the legal advice is specific and grounded.
3. Assign a confidence score (0-100%).
4. If < 40%, trigger REFUSAL.

Output Format:
{
    "score": 85,
    "reasoning": "...",
    "missing_info": ["Date of incident", ...],
    "refusal_triggered": true/false
}
Return ONLY valid JSON."#;

const TRANSLATE_TEMPLATE: &str = r#"Translate the following text to {language}.
Text: "{text}"

Return ONLY the translated text. No explanations."#;

const DETECT_TEMPLATE: &str = r#"Detect the language of the following text: "{text}".
Return ONLY the language name (e.g., Hindi, Kannada, English)."#;

/// Placeholder shown when no corpus produced a match.
pub const EMPTY_CONTEXT: &str = "(no matching records)";

pub fn legal_prompt(situation: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        EMPTY_CONTEXT
    } else {
        context
    };
    LEGAL_TEMPLATE
        .replace("{situation}", situation)
        .replace("{context}", context)
}

pub fn risk_prompt(situation: &str, legal: &str) -> String {
    RISK_TEMPLATE
        .replace("{situation}", situation)
        .replace("{legal}", legal)
}

pub fn ethics_prompt(situation: &str, risk: &str) -> String {
    ETHICS_TEMPLATE
        .replace("{situation}", situation)
        .replace("{risk}", risk)
}

pub fn confidence_prompt(situation: &str, legal: &str, risk: &str) -> String {
    CONFIDENCE_TEMPLATE
        .replace("{situation}", situation)
        .replace("{legal}", legal)
        .replace("{risk}", risk)
}

pub fn translate_prompt(text: &str, target_language: &str) -> String {
    TRANSLATE_TEMPLATE
        .replace("{language}", target_language)
        .replace("{text}", text)
}

pub fn detect_language_prompt(text: &str) -> String {
    DETECT_TEMPLATE.replace("{text}", text)
}
