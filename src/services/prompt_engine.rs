use crate::{
    constants::prompts::QUESTION_JSON_EXAMPLE,
    models::domain::{
        question::QuestionType,
        quiz_config::{AnalysisDepth, Difficulty, QuizConfig},
        AdvancedQuestion,
    },
};

pub const MAX_CONTENT_CHARS: usize = 8000;
pub const MAX_EXISTING_SUMMARIES: usize = 20;
pub const SUMMARY_CHARS: usize = 80;

/// Builds generation prompts. Pure functions of their inputs.
pub struct QuizPromptEngine;

impl QuizPromptEngine {
    pub fn build_prompt(content: &str, config: &QuizConfig) -> String {
        let count = config.question_count as usize;
        let mut prompt = String::new();

        prompt.push_str(&count_banner(count));
        prompt.push_str("\n\n## QUESTION TYPES\n");
        prompt.push_str(&type_instructions(&config.question_types));
        prompt.push_str(&steering_section(config));
        prompt.push_str("\n## RESPONSE FORMAT\nReturn a JSON object shaped exactly like this example:\n");
        prompt.push_str(QUESTION_JSON_EXAMPLE);
        prompt.push_str("\n\n## CONTENT\n");
        prompt.push_str(&truncate_content(content));
        prompt.push_str(&format!(
            "\n\nREMEMBER: the \"questions\" array must contain EXACTLY {} item{}. Count them before you answer.",
            count,
            plural(count)
        ));

        prompt
    }

    /// Follow-up prompt asking for `remaining` more questions that do not
    /// repeat the ones already produced.
    pub fn build_supplementary_prompt(
        content: &str,
        config: &QuizConfig,
        remaining: usize,
        existing: &[AdvancedQuestion],
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "A previous response did not contain enough questions. Generate EXACTLY {} ADDITIONAL question{}.\n",
            remaining,
            plural(remaining)
        ));
        prompt.push_str(&count_banner(remaining));

        if !existing.is_empty() {
            prompt.push_str("\n\n## ALREADY GENERATED (do not repeat or rephrase these)\n");
            for question in existing.iter().take(MAX_EXISTING_SUMMARIES) {
                prompt.push_str(&format!(
                    "- [{}] {}\n",
                    question.question_type,
                    question.summary(SUMMARY_CHARS)
                ));
            }
            if existing.len() > MAX_EXISTING_SUMMARIES {
                prompt.push_str(&format!(
                    "- ...and {} more\n",
                    existing.len() - MAX_EXISTING_SUMMARIES
                ));
            }
        }

        prompt.push_str("\n## QUESTION TYPES\n");
        prompt.push_str(&type_instructions(&config.question_types));
        prompt.push_str(&steering_section(config));
        prompt.push_str("\n## RESPONSE FORMAT\nReturn a JSON object shaped exactly like this example:\n");
        prompt.push_str(QUESTION_JSON_EXAMPLE);
        prompt.push_str("\n\n## CONTENT\n");
        prompt.push_str(&truncate_content(content));
        prompt.push_str(&format!(
            "\n\nREMEMBER: return EXACTLY {} new question{}.",
            remaining,
            plural(remaining)
        ));

        prompt
    }

    /// Prompt for the image backing a visual question.
    pub fn build_image_prompt(question_type: QuestionType, description: &str) -> String {
        let style = match question_type {
            QuestionType::ChartAnalysis => "a clean, labeled data chart",
            QuestionType::DiagramLabeling => {
                "an educational diagram with numbered parts and no text labels"
            }
            _ => "a clear educational illustration",
        };
        format!(
            "Create {} on a white background for a study quiz. {}",
            style,
            description.trim()
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn count_banner(count: usize) -> String {
    format!(
        "You MUST generate EXACTLY {count} question{s}. Not {fewer}, not {more}. EXACTLY {count}.",
        count = count,
        s = plural(count),
        fewer = count.saturating_sub(1),
        more = count + 1
    )
}

pub fn type_instruction(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => "- multiple_choice: four options prefixed \"A) \" to \"D) \"; correct_answer is the single letter of the right option.",
        QuestionType::TrueFalseExplained => "- true_false_explained: a statement to judge; correct_answer is a JSON boolean; the explanation says why.",
        QuestionType::ScenarioBased => "- scenario_based: a short realistic scenario followed by a question applying the material; correct_answer is a model answer.",
        QuestionType::VisualInterpretation => "- visual_interpretation: describe an image in visual_description and ask what it shows; correct_answer is a model answer.",
        QuestionType::MultiPart => "- multi_part: a shared stem with 2-4 sub_questions, each with its own correct_answer; correct_answer lists them in order.",
        QuestionType::DiagramLabeling => "- diagram_labeling: describe a diagram with numbered parts in visual_description; correct_answer names the labels in order.",
        QuestionType::ChartAnalysis => "- chart_analysis: describe a chart with concrete values in visual_description; correct_answer states the insight.",
        QuestionType::ComparisonAnalysis => "- comparison_analysis: ask to compare or contrast two concepts; correct_answer lists the key similarities and differences.",
        QuestionType::ShortEssay => "- short_essay: an open question answerable in 3-5 sentences; correct_answer is a concise model answer.",
    }
}

fn type_instructions(types: &[QuestionType]) -> String {
    let mut out = String::new();
    let mut seen: Vec<QuestionType> = Vec::new();
    for question_type in types {
        if seen.contains(question_type) {
            continue;
        }
        seen.push(*question_type);
        out.push_str(type_instruction(*question_type));
        out.push('\n');
    }
    if seen.len() > 1 {
        out.push_str("Distribute the questions across these types as evenly as possible.\n");
    }
    out
}

fn difficulty_modifier(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Beginner => "Target beginners: test recall of key definitions and facts with plain wording.",
        Difficulty::Intermediate => "Target intermediate learners: test understanding and simple application of concepts.",
        Difficulty::Advanced => "Target advanced learners: test application and analysis, with plausible distractors.",
        Difficulty::Expert => "Target experts: test synthesis and evaluation, including edge cases and subtle distinctions.",
    }
}

fn depth_modifier(depth: AnalysisDepth) -> &'static str {
    match depth {
        AnalysisDepth::Surface => "Stay close to what the content states explicitly.",
        AnalysisDepth::Moderate => "Connect related ideas within the content where it helps understanding.",
        AnalysisDepth::Deep => "Probe underlying principles, causes and implications of the content.",
    }
}

fn steering_section(config: &QuizConfig) -> String {
    let mut out = String::from("\n## GUIDANCE\n");
    out.push_str(difficulty_modifier(config.difficulty));
    out.push('\n');
    out.push_str(depth_modifier(config.depth));
    out.push('\n');

    let categories = clean_list(&config.categories);
    if !categories.is_empty() {
        out.push_str(&format!(
            "Focus the questions on these categories and tag each question with the ones it covers: {}.\n",
            categories.join(", ")
        ));
    }

    let keywords = clean_list(&config.custom_keywords);
    if !keywords.is_empty() {
        out.push_str(&format!(
            "Work these key terms into the questions where the content supports them: {}.\n",
            keywords.join(", ")
        ));
    }

    if config.include_explanations {
        out.push_str("Every question needs an explanation of at least one full sentence.\n");
    } else {
        out.push_str("Keep explanations to one short sentence.\n");
    }
    if config.enable_multi_part {
        out.push_str("Multi-part stems are welcome where a topic has several connected steps.\n");
    }
    if config.include_visuals {
        out.push_str("Where a question relies on a visual, describe it precisely in visual_description.\n");
    }

    out
}

fn clean_list(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn truncate_content(content: &str) -> String {
    let content = content.trim();
    let total = content.chars().count();
    if total <= MAX_CONTENT_CHARS {
        return content.to_string();
    }

    let head: String = content.chars().take(MAX_CONTENT_CHARS).collect();
    format!(
        "{}\n\n[Content truncated: showing the first {} of {} characters]",
        head, MAX_CONTENT_CHARS, total
    )
}
