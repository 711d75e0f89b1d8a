// src/generator/prompt.rs

use serde::Serialize;

use crate::config::{OPTION_COUNT, QUESTION_COUNT};

const SYSTEM_PROMPT: &str = "You are a quiz generator. Output ONLY valid JSON. \
Never use quotes or apostrophes inside question or option text. \
Never use escape characters. Output pure JSON only, no markdown, no explanations.";

/// A single chat message in the OpenAI-compatible wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Builds the system + user messages for a quiz over the given student code.
pub fn build_messages(code: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user",
            content: user_prompt(code),
        },
    ]
}

fn user_prompt(code: &str) -> String {
    let last_option = OPTION_COUNT - 1;
    format!(
        r#"
You are a teaching assistant for a Web Programming course. Based on the following HTML code with internal CSS written by a student, create {count} multiple-choice questions that test their UNDERSTANDING OF CONCEPTS.

The student's HTML code with internal CSS:
```html
{code}
```

RULES FOR THE QUESTIONS:

1. FOCUS ON CONCEPTUAL UNDERSTANDING, NOT MEMORIZING THE CODE
   GOOD example: "What does the font-weight property do in CSS?"
   BAD example: "What is the font size of h1 in the code?"

2. TOPICS TO COVER:
   - Font style (font-family, font-size, font-weight, font-style)
   - Text style (text-align, text-decoration, text-transform, line-height)
   - Background (background-color, background-image)
   - Display (block and inline)
   - Div and Span
   - CSS Selectors (element, class, id)

3. QUESTION CRITERIA:
   - Answerable without looking at the code
   - {options} plausible answer options
   - Medium difficulty
   - Varied topics

IMPORTANT - JSON RULES:
1. Output ONLY JSON, with no text before or after it
2. Do NOT use double quotes inside question or answer text
3. Do NOT use escape sequences (\n, \t, etc.)
4. Use simple words without special characters
5. Do NOT use apostrophes inside text, rephrase instead

Example of the CORRECT format:
{{
  "questions": [
    {{
      "question": "What does the font-weight property do in CSS?",
      "options": [
        "Sets the thickness of the text",
        "Sets the font size",
        "Sets the font family",
        "Sets the font color"
      ],
      "correct_answer": 0
    }}
  ]
}}

REQUIRED:
- Create EXACTLY {count} questions
- correct_answer is an index from 0 to {last_option}
- Output ONLY valid JSON, no other text
- Do NOT use quote characters or apostrophes inside strings
"#,
        count = QUESTION_COUNT,
        options = OPTION_COUNT,
        code = code,
        last_option = last_option,
    )
}
