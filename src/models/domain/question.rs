use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[serde(alias = "mcq")]
    MultipleChoice,
    #[serde(alias = "true_false")]
    TrueFalseExplained,
    #[serde(alias = "scenario")]
    ScenarioBased,
    VisualInterpretation,
    MultiPart,
    DiagramLabeling,
    ChartAnalysis,
    #[serde(alias = "comparison")]
    ComparisonAnalysis,
    #[serde(alias = "essay")]
    ShortEssay,
}

impl QuestionType {
    pub const ALL: [QuestionType; 9] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalseExplained,
        QuestionType::ScenarioBased,
        QuestionType::VisualInterpretation,
        QuestionType::MultiPart,
        QuestionType::DiagramLabeling,
        QuestionType::ChartAnalysis,
        QuestionType::ComparisonAnalysis,
        QuestionType::ShortEssay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalseExplained => "true_false_explained",
            QuestionType::ScenarioBased => "scenario_based",
            QuestionType::VisualInterpretation => "visual_interpretation",
            QuestionType::MultiPart => "multi_part",
            QuestionType::DiagramLabeling => "diagram_labeling",
            QuestionType::ChartAnalysis => "chart_analysis",
            QuestionType::ComparisonAnalysis => "comparison_analysis",
            QuestionType::ShortEssay => "short_essay",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, QuestionType::TrueFalseExplained)
    }

    pub fn is_multi_part(&self) -> bool {
        matches!(self, QuestionType::MultiPart)
    }

    /// Types that carry a generated image alongside the question.
    pub fn is_visual(&self) -> bool {
        matches!(
            self,
            QuestionType::DiagramLabeling
                | QuestionType::ChartAnalysis
                | QuestionType::VisualInterpretation
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "multiple_choice" | "mcq" => Ok(QuestionType::MultipleChoice),
            "true_false_explained" | "true_false" => Ok(QuestionType::TrueFalseExplained),
            "scenario_based" | "scenario" => Ok(QuestionType::ScenarioBased),
            "visual_interpretation" => Ok(QuestionType::VisualInterpretation),
            "multi_part" => Ok(QuestionType::MultiPart),
            "diagram_labeling" => Ok(QuestionType::DiagramLabeling),
            "chart_analysis" => Ok(QuestionType::ChartAnalysis),
            "comparison_analysis" | "comparison" => Ok(QuestionType::ComparisonAnalysis),
            "short_essay" | "essay" => Ok(QuestionType::ShortEssay),
            other => Err(format!("Unknown question type '{}'", other)),
        }
    }
}

/// Type-dependent representation of a correct answer as generated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Boolean(bool),
    Index(i64),
    Text(String),
    List(Vec<String>),
}

impl CorrectAnswer {
    pub fn to_value(&self) -> Value {
        match self {
            CorrectAnswer::Boolean(b) => Value::Bool(*b),
            CorrectAnswer::Index(i) => Value::from(*i),
            CorrectAnswer::Text(s) => Value::String(s.clone()),
            CorrectAnswer::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CorrectAnswer::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SubQuestion {
    pub question: String,
    pub correct_answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct VisualContent {
    /// Base64 image payload; `None` when image generation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct QuestionMetadata {
    pub difficulty: u8,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub estimated_time_seconds: u32,
    #[serde(default)]
    pub learning_objective: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct AdvancedQuestion {
    pub id: String,
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_questions: Vec<SubQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualContent>,
    pub metadata: QuestionMetadata,
    #[serde(default)]
    pub is_fallback: bool,
}

impl AdvancedQuestion {
    /// One-line summary used to steer follow-up prompts away from repeats.
    pub fn summary(&self, max_chars: usize) -> String {
        let text = self.question.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.chars().count() <= max_chars {
            text
        } else {
            let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", truncated.trim_end())
        }
    }

    /// Correct answer as a JSON value comparable with user answers.
    pub fn correct_value(&self) -> Value {
        if self.question_type.is_multi_part() && !self.sub_questions.is_empty() {
            return Value::Array(
                self.sub_questions
                    .iter()
                    .map(|sq| Value::String(sq.correct_answer.clone()))
                    .collect(),
            );
        }
        self.correct_answer.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_round_trip_serialization() {
        for variant in QuestionType::ALL {
            let json = serde_json::to_string(&variant).expect("variant should serialize");
            assert_eq!(json, format!("\"{}\"", variant.as_str()));
            let parsed: QuestionType =
                serde_json::from_str(&json).expect("variant should deserialize");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn question_type_accepts_aliases() {
        let parsed: QuestionType = serde_json::from_str("\"true_false\"").unwrap();
        assert_eq!(parsed, QuestionType::TrueFalseExplained);
        assert_eq!(
            "Short Essay".parse::<QuestionType>(),
            Ok(QuestionType::ShortEssay)
        );
        assert!("crossword".parse::<QuestionType>().is_err());
    }

    #[test]
    fn visual_types_are_exactly_three() {
        let visual: Vec<_> = QuestionType::ALL.iter().filter(|t| t.is_visual()).collect();
        assert_eq!(visual.len(), 3);
        assert!(!QuestionType::MultipleChoice.is_visual());
    }

    #[test]
    fn correct_answer_untagged_shapes() {
        let b: CorrectAnswer = serde_json::from_str("true").unwrap();
        let i: CorrectAnswer = serde_json::from_str("2").unwrap();
        let t: CorrectAnswer = serde_json::from_str("\"B\"").unwrap();
        let l: CorrectAnswer = serde_json::from_str(r#"["a","b"]"#).unwrap();

        assert_eq!(b, CorrectAnswer::Boolean(true));
        assert_eq!(i, CorrectAnswer::Index(2));
        assert_eq!(t, CorrectAnswer::Text("B".into()));
        assert_eq!(l, CorrectAnswer::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn summary_truncates_long_questions() {
        let question = AdvancedQuestion {
            id: "q-1".into(),
            question_type: QuestionType::ShortEssay,
            question: "Explain   the\nrole of mitochondria in cellular respiration and energy".into(),
            options: vec![],
            correct_answer: CorrectAnswer::Text("ATP production".into()),
            explanation: String::new(),
            sub_questions: vec![],
            visual: None,
            metadata: QuestionMetadata {
                difficulty: 3,
                categories: vec![],
                estimated_time_seconds: 60,
                learning_objective: String::new(),
            },
            is_fallback: false,
        };

        let summary = question.summary(20);
        assert!(summary.chars().count() <= 20);
        assert!(summary.starts_with("Explain the role"));
        assert!(summary.ends_with("..."));
    }
}
