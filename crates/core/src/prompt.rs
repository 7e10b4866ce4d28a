//! Prompt construction for the interviewer LLM.
//!
//! Every prompt embeds the full configured scope (role, level, tech stack,
//! interview type, and the literal question list when one was supplied) as
//! hard constraints. This is prompt-level policy only; nothing downstream
//! verifies that the model actually stayed in scope.

use crate::session::{CandidateProfile, InterviewParams, QaPair};

/// The system/instruction turn stored as the first turn of every session.
pub fn system_prompt(params: &InterviewParams) -> String {
    let techstack = params.techstack_str();
    let question_scope = question_scope_block(params);

    format!(
        "You are an expert technical interviewer conducting a {role} interview at {level} level.\n\
         \n\
         INTERVIEW SCOPE (mandatory, do not deviate):\n\
         - Position: {role}\n\
         - Experience level: {level}\n\
         - Technologies: {techstack}\n\
         - Interview type: {interview_type}\n\
         {question_scope}\n\
         FLOW:\n\
         1. Start by asking the candidate to introduce themselves. Do not ask about the \
         role, level or technologies — those are already known.\n\
         2. After the introduction, ask questions strictly within the scope above, one at \
         a time, each building on the previous answers.\n\
         3. There is no fixed number of questions; continue until the candidate asks to stop.\n\
         4. Give brief constructive feedback after each answer, one or two sentences at most.\n\
         5. Keep every question and every piece of feedback concise, two sentences maximum.\n\
         \n\
         ANTI-REPETITION:\n\
         - Never echo the candidate's answer back to them.\n\
         - Never repeat a question you already asked.\n\
         - Acknowledge in one short sentence, then move to the next question.",
        role = params.role,
        level = params.level,
        techstack = techstack,
        interview_type = params.interview_type,
        question_scope = question_scope,
    )
}

fn question_scope_block(params: &InterviewParams) -> String {
    if params.questions.is_empty() {
        "\nQUESTION SCOPE: no prepared questions were provided. Generate questions \
         strictly from the position, level, technologies and interview type above.\n"
            .to_string()
    } else {
        let list = params
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "\nPREPARED QUESTIONS ({count} total, mandatory scope):\n{list}\n\
             Ask only these questions, natural variations of them, or follow-ups directly \
             related to them. Never ask outside this list.\n",
            count = params.questions.len(),
            list = list,
        )
    }
}

/// The deterministic opening message. No LLM call is made for this; the
/// greeting is a template over the configured parameters.
pub fn greeting(params: &InterviewParams) -> String {
    format!(
        "Hello! Welcome to your interview. To get started, could you please:\n\
         1. Introduce yourself — your name, background and relevant experience.\n\
         2. Confirm the interview details: role ({role}), difficulty level ({level}), \
         tech stack ({techstack}), and number of prepared questions ({count}).\n\
         \n\
         Please share your introduction and confirm these details.",
        role = params.role,
        level = params.level,
        techstack = params.techstack_str(),
        count = params.questions.len(),
    )
}

/// Prompt for the first real question, right after the candidate's
/// introduction. A distinct variant from [`follow_up`] so the model does not
/// re-ask the greeting.
pub fn first_question(params: &InterviewParams) -> String {
    format!(
        "The candidate has just introduced themselves and confirmed the interview \
         details.{scope}\n\
         Briefly acknowledge the introduction in one sentence, then ask your FIRST \
         technical question from the scope above. Two to three sentences total.",
        scope = scope_reminder(params),
    )
}

/// Prompt for every later answer.
pub fn follow_up(params: &InterviewParams, last_answer: &str) -> String {
    format!(
        "The candidate just responded to your question with:\n---\n{last_answer}\n---\
         {scope}\n\
         Do not repeat their answer, do not say \"you mentioned\", and do not repeat \
         your previous question. Acknowledge in one short sentence and ask the NEXT \
         question from the scope above. Two to three sentences total.",
        last_answer = last_answer,
        scope = scope_reminder(params),
    )
}

fn scope_reminder(params: &InterviewParams) -> String {
    let base = format!(
        "\nSCOPE REMINDER (mandatory): role {role}, level {level}, technologies [{tech}], \
         type {ty}.",
        role = params.role,
        level = params.level,
        tech = params.techstack_str(),
        ty = params.interview_type,
    );
    if params.questions.is_empty() {
        base
    } else {
        format!(
            "{base} Your next question must come from the {count} prepared questions or be \
             a direct follow-up to one of them.",
            base = base,
            count = params.questions.len(),
        )
    }
}

/// Prompt for the structured closing feedback generated when an interview ends.
pub fn closing_feedback(profile: &CandidateProfile, qa_pairs: &[QaPair]) -> String {
    let qa_summary = qa_pairs
        .iter()
        .map(|qa| format!("Q: {}\nA: {}\n", qa.question, qa.answer))
        .collect::<Vec<_>>()
        .join("\n");
    let profile_json =
        serde_json::to_string_pretty(profile).unwrap_or_else(|_| "{}".to_string());

    format!(
        "As an expert technical interviewer, analyze the following interview and provide \
         balanced, objective feedback.\n\
         \n\
         Candidate information:\n{profile_json}\n\
         \n\
         Interview summary:\n{qa_summary}\n\
         \n\
         Provide:\n\
         1. Technical proficiency (score /100)\n\
         2. Communication and soft skills (score /100)\n\
         3. Top 3 strengths, top 3 areas for improvement, and a final recommendation.\n\
         \n\
         Be specific with examples from the answers, keep it professional, and stay \
         under 200 words.",
        profile_json = profile_json,
        qa_summary = qa_summary,
    )
}

/// Prompt for the one-line farewell spoken when the candidate ends the
/// interview.
pub fn farewell() -> &'static str {
    "The candidate has decided to end the interview. Provide a brief, polite closing \
     message thanking them for their time. One sentence, and do not repeat any previous \
     conversation."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InterviewParams;

    fn params_with_questions() -> InterviewParams {
        InterviewParams {
            role: "Data Engineer".to_string(),
            level: "senior".to_string(),
            techstack: vec!["Python".to_string(), "Spark".to_string()],
            questions: vec![
                "Explain watermarking in streaming pipelines.".to_string(),
                "How do you backfill a partitioned table?".to_string(),
            ],
            ..InterviewParams::default()
        }
    }

    #[test]
    fn system_prompt_embeds_the_full_scope() {
        let prompt = system_prompt(&params_with_questions());
        assert!(prompt.contains("Data Engineer"));
        assert!(prompt.contains("senior"));
        assert!(prompt.contains("Python, Spark"));
        assert!(prompt.contains("watermarking"));
        assert!(prompt.contains("2 total"));
    }

    #[test]
    fn system_prompt_without_questions_falls_back_to_generated_scope() {
        let params = InterviewParams::default();
        let prompt = system_prompt(&params);
        assert!(prompt.contains("no prepared questions"));
        assert!(prompt.contains("Software Engineer"));
    }

    #[test]
    fn greeting_mentions_role_and_question_count() {
        let greeting = greeting(&params_with_questions());
        assert!(greeting.contains("Data Engineer"));
        assert!(greeting.contains("2"));
        assert!(greeting.contains("introduce yourself") || greeting.contains("Introduce yourself"));
    }

    #[test]
    fn follow_up_carries_the_answer_and_the_scope() {
        let prompt = follow_up(&params_with_questions(), "We use event-time watermarks.");
        assert!(prompt.contains("event-time watermarks"));
        assert!(prompt.contains("prepared questions"));
    }
}
