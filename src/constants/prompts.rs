pub const QUIZ_GENERATOR_SYSTEM_PROMPT: &str = "You are an expert educational assessment designer. You write accurate, unambiguous quiz questions that are directly supported by the study material you are given.

## RULES

1. Every question and every correct answer must be supported by the provided content. Do not invent facts.
2. Follow the requested question types, difficulty and count exactly.
3. Return ONLY a single valid JSON object. No markdown, no code fences, no commentary.
4. Use the field names shown in the example schema. Do not add other keys.";

pub const CHAT_ASSISTANT_SYSTEM_PROMPT: &str = "You are a patient, encouraging study assistant. Explain concepts clearly, check understanding with short follow-up questions, and say so plainly when you are not sure about something. Keep answers focused on helping the learner study.";

/// Literal example of the expected generation response.
pub const QUESTION_JSON_EXAMPLE: &str = r#"{
  "questions": [
    {
      "type": "multiple_choice",
      "question": "Which organelle produces most of a cell's ATP?",
      "options": ["A) Nucleus", "B) Mitochondrion", "C) Ribosome", "D) Golgi apparatus"],
      "correct_answer": "B",
      "explanation": "Mitochondria carry out oxidative phosphorylation, the main source of ATP.",
      "difficulty": 3,
      "categories": ["cell biology"],
      "estimated_time_seconds": 45,
      "learning_objective": "Identify the function of mitochondria"
    },
    {
      "type": "true_false_explained",
      "question": "Ribosomes are only found attached to the endoplasmic reticulum.",
      "correct_answer": false,
      "explanation": "Ribosomes also float freely in the cytoplasm."
    },
    {
      "type": "multi_part",
      "question": "Consider the process of photosynthesis.",
      "sub_questions": [
        { "question": "Where does it take place?", "correct_answer": "In the chloroplasts" },
        { "question": "Which gas is released?", "correct_answer": "Oxygen" }
      ],
      "correct_answer": ["In the chloroplasts", "Oxygen"],
      "explanation": "Light reactions in chloroplasts split water and release oxygen."
    },
    {
      "type": "chart_analysis",
      "question": "What trend does the chart show between 2010 and 2020?",
      "visual_description": "A line chart of yearly average temperature rising steadily from 14.5 to 15.2 degrees",
      "correct_answer": "A steady increase in average temperature",
      "explanation": "Each year's value is higher than the previous one."
    }
  ]
}"#;
